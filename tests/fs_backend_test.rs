use chrono::Utc;
use quire::images::{FsImageStore, ImageSelection, ImageStore, PathPicker, ReferenceScheme};
use quire::manager::PostManager;
use quire::model::{NewPost, Post, PostPatch};
use quire::store::fs_backend::FsBackend;
use quire::store::StorageBackend;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn manager(root: &Path) -> PostManager<FsBackend<Post>, FsImageStore> {
    let mut m = PostManager::new(
        FsBackend::under(root),
        FsImageStore::new(root.join("images"), ReferenceScheme::Public),
    );
    m.load().unwrap();
    m
}

fn source_image(dir: &Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"\x89PNG not really").unwrap();
    path
}

#[test]
fn test_fs_backend_save_list_delete() {
    let tmp = TempDir::new().unwrap();
    let backend = FsBackend::<Post>::under(tmp.path());
    let post = Post::from_new(NewPost::new("Hello", "World"), Utc::now());

    backend.save(&post).unwrap();
    let listing = backend.list().unwrap();
    assert_eq!(listing.records, vec![post.clone()]);
    assert_eq!(listing.skipped, 0);

    backend.delete(&post.id).unwrap();
    assert!(backend.list().unwrap().records.is_empty());
    assert!(backend.delete(&post.id).is_err());
}

#[test]
fn test_fs_backend_atomic_write_artifacts() {
    let tmp = TempDir::new().unwrap();
    let backend = FsBackend::<Post>::under(tmp.path());
    let post = Post::from_new(NewPost::new("Atomic", ""), Utc::now());

    backend.save(&post).unwrap();
    assert!(tmp.path().join("posts").join(format!("{}.json", post.id)).exists());

    for entry in fs::read_dir(tmp.path().join("posts")).unwrap() {
        let path = entry.unwrap().path();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(!name.ends_with(".tmp"), "Found leftover tmp file: {}", name);
    }
}

#[test]
fn test_fs_backend_skips_corrupt_records() {
    let tmp = TempDir::new().unwrap();
    let backend = FsBackend::<Post>::under(tmp.path());
    let post = Post::from_new(NewPost::new("Good", ""), Utc::now());
    backend.save(&post).unwrap();

    let dir = tmp.path().join("posts");
    fs::write(dir.join("broken.json"), "{ not json").unwrap();
    fs::write(dir.join("no-id.json"), r#"{"createdAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-01T00:00:00Z"}"#).unwrap();
    fs::write(dir.join("notes.txt"), "ignored").unwrap();

    let listing = backend.list().unwrap();
    assert_eq!(listing.records.len(), 1);
    assert_eq!(listing.skipped, 2);
}

#[test]
fn test_references_survive_reload_byte_for_byte() {
    let tmp = TempDir::new().unwrap();
    let content = "Intro\n\n![Image](/images/1712345678901-my cat.png)\n\n<img src=\"quire-image://2-b.gif\" alt=\"b\">";
    let id = {
        let mut m = manager(tmp.path());
        m.create(NewPost::new("Pics", content)).unwrap().id
    };

    let reloaded = manager(tmp.path());
    assert_eq!(reloaded.get(&id).unwrap().content, content);
}

#[test]
fn test_delete_removes_owned_image_files() {
    let tmp = TempDir::new().unwrap();
    let mut m = manager(tmp.path());
    let post = m.create(NewPost::new("With image", "text")).unwrap();

    let (post, reference) = m
        .attach_image(&post.id, &PathPicker(Some(source_image(tmp.path(), "cat.png"))))
        .unwrap()
        .unwrap();
    let file = m.images().resolve(&reference).unwrap();
    assert!(file.exists());

    m.delete(&post.id).unwrap();
    assert!(!file.exists());
    assert!(manager(tmp.path()).list().is_empty());
}

#[test]
fn test_removing_reference_deletes_only_that_file() {
    let tmp = TempDir::new().unwrap();
    let mut m = manager(tmp.path());
    let post = m.create(NewPost::new("Two", "")).unwrap();

    let (_, first) = m
        .attach_image(&post.id, &PathPicker(Some(source_image(tmp.path(), "a.png"))))
        .unwrap()
        .unwrap();
    let (post, second) = m
        .attach_image(&post.id, &PathPicker(Some(source_image(tmp.path(), "b.jpg"))))
        .unwrap()
        .unwrap();
    let first_file = m.images().resolve(&first).unwrap();
    let second_file = m.images().resolve(&second).unwrap();

    let without_first = post
        .content
        .lines()
        .filter(|line| !line.contains(&first))
        .collect::<Vec<_>>()
        .join("\n");
    let updated = m
        .update(&post.id, PostPatch::default().content(without_first))
        .unwrap();

    assert!(!first_file.exists());
    assert!(second_file.exists());
    assert_eq!(updated.images, vec![second]);
}

#[test]
fn test_attach_keeps_files_with_awkward_names() {
    let tmp = TempDir::new().unwrap();
    let mut m = manager(tmp.path());
    let post = m.create(NewPost::new("Names", "")).unwrap();

    let mut references = Vec::new();
    for name in ["a(b.png", "x)y.png", "a&amp;b.png", "back\\slash.png"] {
        let (updated, reference) = m
            .attach_image(&post.id, &PathPicker(Some(source_image(tmp.path(), name))))
            .unwrap()
            .unwrap();
        assert!(updated.images.contains(&reference), "untracked {}", reference);
        assert!(m.images().resolve(&reference).is_some(), "missing {}", reference);
        references.push(reference);
    }

    let reloaded = manager(tmp.path());
    assert_eq!(reloaded.get(&post.id).unwrap().images, references);
    for reference in &references {
        assert!(reloaded.images().resolve(reference).is_some());
    }
}

#[test]
fn test_image_store_select_and_resolve() {
    let tmp = TempDir::new().unwrap();
    let store = FsImageStore::new(tmp.path().join("images"), ReferenceScheme::Custom);

    let selection = store
        .select(&PathPicker(Some(source_image(tmp.path(), "pic.webp"))))
        .unwrap();
    let ImageSelection::Selected { reference, file_name } = selection else {
        panic!("expected a selection");
    };
    assert_eq!(reference, format!("quire-image://{}", file_name));
    assert_eq!(
        fs::read(store.resolve(&reference).unwrap()).unwrap(),
        b"\x89PNG not really"
    );
}
