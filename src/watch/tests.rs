use super::*;
use notify::event::{
    AccessKind, CreateKind, DataChange, EventKind, MetadataKind, ModifyKind, RemoveKind, RenameMode,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn wait_for(mut predicate: impl FnMut() -> bool, label: &str) {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if predicate() {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("timeout waiting for {label}");
}

#[test]
fn normalize_drops_cur_dir_and_duplicate_separators() {
    assert_eq!(
        normalize(Path::new("/srv//audio/./tokens.txt")),
        PathBuf::from("/srv/audio/tokens.txt")
    );
    assert_eq!(normalize(Path::new("/srv/audio/")), PathBuf::from("/srv/audio"));
}

#[test]
fn absolutize_anchors_relative_paths() {
    let p = absolutize(Path::new("./some/file.txt")).unwrap();
    assert!(p.is_absolute());
    assert!(p.ends_with("some/file.txt"));
}

#[test]
fn change_op_maps_notify_kinds() {
    assert_eq!(
        ChangeOp::from_kind(&EventKind::Create(CreateKind::File)),
        Some(ChangeOp::Create)
    );
    assert_eq!(
        ChangeOp::from_kind(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
        Some(ChangeOp::Write)
    );
    assert_eq!(
        ChangeOp::from_kind(&EventKind::Modify(ModifyKind::Name(RenameMode::To))),
        Some(ChangeOp::Rename)
    );
    assert_eq!(
        ChangeOp::from_kind(&EventKind::Remove(RemoveKind::File)),
        Some(ChangeOp::Remove)
    );
    assert_eq!(
        ChangeOp::from_kind(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions))),
        None
    );
    assert_eq!(ChangeOp::from_kind(&EventKind::Access(AccessKind::Any)), None);
}

#[test]
fn from_notify_yields_one_change_per_path() {
    let event = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
        .add_path(PathBuf::from("/a/old.mp3"))
        .add_path(PathBuf::from("/a/new.mp3"));

    let changes = ChangeEvent::from_notify(event);
    assert_eq!(
        changes,
        vec![
            ChangeEvent::new("/a/old.mp3", ChangeOp::Rename),
            ChangeEvent::new("/a/new.mp3", ChangeOp::Rename),
        ]
    );
    assert!(changes[0].op.is_removal());
}

fn start_engine(dir: &Path) -> (Engine, Arc<Mutex<Vec<ChangeEvent>>>) {
    let (notifier, events) = Notifier::new().unwrap();
    let notifier = Arc::new(notifier);
    notifier.watch(dir).unwrap();

    let scheduler = Arc::new(
        RefreshScheduler::spawn("engine-test", Duration::from_millis(10), || Ok::<(), String>(()))
            .unwrap(),
    );

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let engine = Engine::start("engine-test", notifier, events, scheduler, move |change| {
        sink.lock().push(change);
    })
    .unwrap();
    (engine, seen)
}

#[test]
fn engine_pumps_changes_to_handler() {
    let dir = tempfile::tempdir().unwrap();
    let root = absolutize(dir.path()).unwrap();
    let (engine, seen) = start_engine(&root);

    std::fs::write(root.join("a.mp3"), b"x").unwrap();
    wait_for(
        || seen.lock().iter().any(|c| c.path.ends_with("a.mp3")),
        "create event",
    );

    engine.close().unwrap();
}

#[test]
fn engine_close_is_idempotent_and_stops_the_pump() {
    let dir = tempfile::tempdir().unwrap();
    let root = absolutize(dir.path()).unwrap();
    let (engine, seen) = start_engine(&root);

    assert!(!engine.is_closed());
    let first = engine.close();
    let second = engine.close();
    assert!(first.is_ok());
    assert_eq!(first, second);
    assert!(engine.is_closed());

    let before = seen.lock().len();
    std::fs::write(root.join("late.mp3"), b"x").unwrap();
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(seen.lock().len(), before);
}

#[test]
fn concurrent_close_runs_teardown_once() {
    let dir = tempfile::tempdir().unwrap();
    let root = absolutize(dir.path()).unwrap();
    let (engine, _seen) = start_engine(&root);
    let engine = Arc::new(engine);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let e = Arc::clone(&engine);
            std::thread::spawn(move || e.close())
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(results.iter().all(|r| r.is_ok()));
}
