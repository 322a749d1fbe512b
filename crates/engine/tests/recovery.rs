#![cfg(unix)]

mod common;

use common::{HELLO, HELLO_CRC, Harness, iso, psp_asset, touch};
use romsync_engine::api::{Api, Response};
use romsync_engine::assets::ProgressSink;
use romsync_remote::MockRemote;
use std::fs;

const ORPHAN_SAVE: &str = "data/saves/psp/game_42_session/memstick/PSP/SAVEDATA/ULUS00042/DATA.BIN";

#[tokio::test]
async fn orphaned_session_is_recovered_once() {
    let h = Harness::new(MockRemote::default(), |_| "exit 0".to_string()).await;
    touch(&h.path(ORPHAN_SAVE), b"unsaved progress");
    touch(&h.path("data/saves/psp/game_42_session/memstick/PSP/SYSTEM/ppsspp.ini"), b"[General]\n");

    assert_eq!(h.engine.recover_orphaned_saves().await.unwrap(), 1);
    let recovered = h.path("data/saves/psp/game_42/memstick/PSP/SAVEDATA/ULUS00042/DATA.BIN");
    assert_eq!(fs::read(recovered).unwrap(), b"unsaved progress");
    assert!(!h.path("data/saves/psp/game_42/memstick/PSP/SYSTEM").exists(), "only save subtrees are kept");
    let sessions: Vec<_> = fs::read_dir(h.path("data/saves/psp"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(sessions, vec!["game_42".to_string()]);

    assert_eq!(h.engine.recover_orphaned_saves().await.unwrap(), 0);
}

#[tokio::test]
async fn first_launch_waits_for_recovery() {
    let remote = MockRemote::default().with_file(7, iso(HELLO_CRC), HELLO);
    let h = Harness::new(remote, |_| "exit 0".to_string()).await;
    touch(&h.path(ORPHAN_SAVE), b"unsaved progress");

    let launched = h
        .engine
        .launch_with_reconciliation(&psp_asset(7, vec![iso(HELLO_CRC)]), ProgressSink::none(), None)
        .await
        .unwrap();
    assert!(h.path("data/saves/psp/game_42/memstick/PSP/SAVEDATA/ULUS00042/DATA.BIN").is_file());
    assert!(!h.path("data/saves/psp/game_42_session").exists());
    launched.completion.await.unwrap().unwrap();
}

#[tokio::test]
async fn api_reports_instead_of_failing() {
    let remote = MockRemote::default().with_file(7, iso(HELLO_CRC), HELLO);
    let h = Harness::new(remote, |_| "exit 0".to_string()).await;
    touch(&h.path(ORPHAN_SAVE), b"unsaved progress");
    let api = Api::new(h.engine);

    assert_eq!(api.recover_orphaned_saves().await, Response::ok(1, "recovered 1 session(s)"));
    let deleted = api.delete_cached(7).await;
    assert!(deleted.success);
    assert_eq!(deleted.data, Some(false));

    let mut asset = psp_asset(7, vec![iso(HELLO_CRC)]);
    asset.platform = "vectrex".to_string();
    let launched = api.launch_with_reconciliation(&asset, ProgressSink::none(), None).await;
    assert!(!launched.success);
    assert_eq!(launched.message, "no emulator configured for platform vectrex");

    let available = api.ensure_available(&psp_asset(7, vec![iso(HELLO_CRC)]), ProgressSink::none()).await;
    assert!(available.success);
    assert_eq!(api.delete_cached(7).await.data, Some(true));
}
