// SQLite metadata store behavior: listings, cascades and never-upsert edits

mod common;

use common::{insert_asset, insert_tag, store};
use std::collections::HashSet;
use time::OffsetDateTime;
use vault_core::{AssetId, AssetPatch, NewAsset, TagId, TagPatch};
use vault_metadata::{
    AssetFilter, AssetRepo, Association, MetadataError, TagRepo, TombstoneRepo,
};

#[tokio::test]
async fn test_create_and_get_asset_roundtrip() {
    let store = store().await;
    let created = insert_asset(&store, "photo.png", Some("holiday"), 0).await;

    let fetched = store.get_asset(created.id).await.unwrap().unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.filename, "photo.png");
    assert_eq!(fetched.blob_key, created.blob_key);
    assert_eq!(fetched.description.as_deref(), Some("holiday"));
    assert!(fetched.tags.is_empty());

    assert!(store.get_asset(AssetId::new()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_asset_rejected() {
    let store = store().await;
    let new = NewAsset::from_upload("a.png", "image/png", 1).unwrap();
    store.create_asset(&new).await.unwrap();

    match store.create_asset(&new).await {
        Err(MetadataError::AlreadyExists(_)) => {}
        other => panic!("expected AlreadyExists, got {other:?}"),
    }
}

#[tokio::test]
async fn test_list_orders_newest_first() {
    let store = store().await;
    let old = insert_asset(&store, "old.png", None, 300).await;
    let mid = insert_asset(&store, "mid.png", None, 200).await;
    let new = insert_asset(&store, "new.png", None, 100).await;

    let ids: Vec<AssetId> = store
        .list_assets(&AssetFilter::all())
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(ids, vec![new.id, mid.id, old.id]);
}

#[tokio::test]
async fn test_list_ties_broken_by_id() {
    let store = store().await;
    let created_at = OffsetDateTime::now_utc();
    let mut expected = Vec::new();
    for name in ["a.png", "b.png", "c.png"] {
        let mut new = NewAsset::from_upload(name, "image/png", 1).unwrap();
        new.created_at = created_at;
        expected.push(store.create_asset(&new).await.unwrap().id);
    }
    expected.sort();

    let ids: Vec<AssetId> = store
        .list_assets(&AssetFilter::all())
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_text_filter_is_case_insensitive() {
    let store = store().await;
    let report = insert_asset(&store, "report.pdf", Some("Q3 numbers"), 10).await;
    insert_asset(&store, "cat.png", None, 5).await;
    let umlaut = insert_asset(&store, "ÜBERSICHT.png", None, 1).await;

    let filter = AssetFilter {
        text: Some("q3".to_string()),
        tag_ids: None,
    };
    let found = store.list_assets(&filter).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, report.id);

    let filter = AssetFilter {
        text: Some("übersicht".to_string()),
        tag_ids: None,
    };
    let found = store.list_assets(&filter).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, umlaut.id);
}

#[tokio::test]
async fn test_tag_filter_is_union_without_duplicates() {
    let store = store().await;
    let red = insert_tag(&store, "red").await;
    let blue = insert_tag(&store, "blue").await;
    let green = insert_tag(&store, "green").await;

    let x = insert_asset(&store, "x.png", None, 3).await;
    let y = insert_asset(&store, "y.png", None, 2).await;
    let z = insert_asset(&store, "z.png", None, 1).await;
    store.set_association(x.id, red.id, true).await.unwrap();
    store.set_association(x.id, blue.id, true).await.unwrap();
    store.set_association(y.id, blue.id, true).await.unwrap();
    store.set_association(z.id, green.id, true).await.unwrap();

    let filter = AssetFilter {
        text: None,
        tag_ids: Some(vec![red.id, blue.id]),
    };
    let found = store.list_assets(&filter).await.unwrap();
    let ids: Vec<AssetId> = found.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![y.id, x.id]);

    let x_listed = found.iter().find(|a| a.id == x.id).unwrap();
    let tag_names: Vec<&str> = x_listed.tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tag_names, vec!["blue", "red"]);
}

#[tokio::test]
async fn test_empty_tag_filter_matches_nothing() {
    let store = store().await;
    insert_asset(&store, "x.png", None, 0).await;

    let filter = AssetFilter {
        text: None,
        tag_ids: Some(Vec::new()),
    };
    assert!(store.list_assets(&filter).await.unwrap().is_empty());
    assert_eq!(store.list_assets(&AssetFilter::all()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_asset_applies_patch() {
    let store = store().await;
    let asset = insert_asset(&store, "draft.png", Some("first"), 0).await;

    let patch = AssetPatch {
        filename: Some("final.png".to_string()),
        description: None,
    };
    let updated = store
        .update_asset(asset.id, &patch, OffsetDateTime::now_utc())
        .await
        .unwrap();
    assert_eq!(updated.filename, "final.png");
    assert_eq!(updated.description.as_deref(), Some("first"));
    assert_eq!(updated.blob_key, asset.blob_key);

    let clear = AssetPatch {
        filename: None,
        description: Some(String::new()),
    };
    let cleared = store
        .update_asset(asset.id, &clear, OffsetDateTime::now_utc())
        .await
        .unwrap();
    assert_eq!(cleared.description, None);
}

#[tokio::test]
async fn test_update_after_delete_does_not_resurrect() {
    let store = store().await;
    let asset = insert_asset(&store, "gone.png", None, 0).await;
    store.delete_asset(asset.id).await.unwrap();

    let patch = AssetPatch {
        filename: Some("back.png".to_string()),
        description: None,
    };
    let err = store
        .update_asset(asset.id, &patch, OffsetDateTime::now_utc())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(store.get_asset(asset.id).await.unwrap().is_none());
    assert!(store.list_assets(&AssetFilter::all()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_missing_asset_is_not_found() {
    let store = store().await;
    assert!(store.delete_asset(AssetId::new()).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_asset_delete_cascades_associations() {
    let store = store().await;
    let tag = insert_tag(&store, "red").await;
    let asset = insert_asset(&store, "x.png", None, 0).await;
    store.set_association(asset.id, tag.id, true).await.unwrap();

    store.delete_asset(asset.id).await.unwrap();
    assert!(store.list_associations().await.unwrap().is_empty());
    assert!(store.get_tag(tag.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_tag_delete_cascades_associations() {
    let store = store().await;
    let red = insert_tag(&store, "red").await;
    let blue = insert_tag(&store, "blue").await;
    let x = insert_asset(&store, "x.png", None, 0).await;
    store.set_association(x.id, red.id, true).await.unwrap();
    store.set_association(x.id, blue.id, true).await.unwrap();

    store.delete_tag(red.id).await.unwrap();

    let tags = store.tags_for_asset(x.id).await.unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].id, blue.id);

    let filter = AssetFilter {
        text: None,
        tag_ids: Some(vec![red.id]),
    };
    assert!(store.list_assets(&filter).await.unwrap().is_empty());
    assert!(store.delete_tag(red.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_set_association_is_idempotent() {
    let store = store().await;
    let tag = insert_tag(&store, "red").await;
    let asset = insert_asset(&store, "x.png", None, 0).await;

    assert!(store.set_association(asset.id, tag.id, true).await.unwrap());
    assert!(!store.set_association(asset.id, tag.id, true).await.unwrap());
    assert_eq!(store.list_associations().await.unwrap().len(), 1);

    assert!(store.set_association(asset.id, tag.id, false).await.unwrap());
    assert!(!store.set_association(asset.id, tag.id, false).await.unwrap());
    assert!(store.list_associations().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_set_association_requires_both_sides() {
    let store = store().await;
    let tag = insert_tag(&store, "red").await;
    let asset = insert_asset(&store, "x.png", None, 0).await;

    assert!(
        store
            .set_association(AssetId::new(), tag.id, true)
            .await
            .unwrap_err()
            .is_not_found()
    );
    assert!(
        store
            .set_association(asset.id, TagId::new(), true)
            .await
            .unwrap_err()
            .is_not_found()
    );
    assert!(
        store
            .set_association(asset.id, TagId::new(), false)
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn test_update_tag_and_listing_order() {
    let store = store().await;
    let zebra = insert_tag(&store, "zebra").await;
    insert_tag(&store, "apple").await;

    let patch = TagPatch {
        name: Some("aardvark".to_string()),
        color: Some("#000000".to_string()),
    };
    let renamed = store.update_tag(zebra.id, &patch).await.unwrap();
    assert_eq!(renamed.name, "aardvark");
    assert_eq!(renamed.color, "#000000");

    let names: Vec<String> = store
        .list_tags()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["aardvark", "apple"]);

    assert!(
        store
            .update_tag(TagId::new(), &patch)
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn test_list_associations_returns_pairs() {
    let store = store().await;
    let red = insert_tag(&store, "red").await;
    let blue = insert_tag(&store, "blue").await;
    let x = insert_asset(&store, "x.png", None, 0).await;
    store.set_association(x.id, red.id, true).await.unwrap();
    store.set_association(x.id, blue.id, true).await.unwrap();

    let pairs: HashSet<Association> = store.list_associations().await.unwrap().into_iter().collect();
    let expected: HashSet<Association> = [red.id, blue.id]
        .into_iter()
        .map(|tag_id| Association {
            asset_id: x.id,
            tag_id,
        })
        .collect();
    assert_eq!(pairs, expected);
}

#[tokio::test]
async fn test_file_backed_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("meta.db");

    let asset_id = {
        let store = vault_metadata::SqliteStore::new(&path, 5).await.unwrap();
        insert_asset(&store, "kept.png", None, 0).await.id
    };

    let reopened = vault_metadata::SqliteStore::new(&path, 5).await.unwrap();
    let asset = reopened.get_asset(asset_id).await.unwrap().unwrap();
    assert_eq!(asset.filename, "kept.png");
}

#[tokio::test]
async fn test_tombstone_lists_asset_details() {
    let store = store().await;
    let first = insert_asset(&store, "first.png", None, 20).await;
    let second = insert_asset(&store, "second.png", None, 10).await;
    insert_asset(&store, "intact.png", None, 0).await;

    let earlier = OffsetDateTime::now_utc() - time::Duration::seconds(60);
    store.create_tombstone(second.id, earlier).await.unwrap();
    store
        .create_tombstone(first.id, OffsetDateTime::now_utc())
        .await
        .unwrap();
    // The first marker wins.
    store
        .create_tombstone(second.id, OffsetDateTime::now_utc())
        .await
        .unwrap();

    let tombstones = store.list_tombstones().await.unwrap();
    let ids: Vec<AssetId> = tombstones
        .iter()
        .map(|t| AssetId::from(t.asset_id))
        .collect();
    assert_eq!(ids, vec![second.id, first.id]);
    assert_eq!(tombstones[0].filename, "second.png");
    assert_eq!(tombstones[0].blob_key, second.blob_key);
}

#[tokio::test]
async fn test_tombstone_requires_asset_and_goes_with_it() {
    let store = store().await;
    match store
        .create_tombstone(AssetId::new(), OffsetDateTime::now_utc())
        .await
    {
        Err(MetadataError::NotFound(_)) => {}
        other => panic!("expected NotFound, got {other:?}"),
    }

    let asset = insert_asset(&store, "gone.png", None, 0).await;
    store
        .create_tombstone(asset.id, OffsetDateTime::now_utc())
        .await
        .unwrap();
    store.delete_asset(asset.id).await.unwrap();
    assert!(store.list_tombstones().await.unwrap().is_empty());
}
