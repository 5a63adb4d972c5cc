#![no_main]

use libfuzzer_sys::fuzz_target;
use pong_view_client::ingestion::{decode, ingest};
use pong_view_client::lifecycle::Lifecycle;
use pong_view_client::render::{render, RenderStyle};
use pong_view_client::snapshot::SnapshotStore;

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = std::str::from_utf8(data) else {
        return;
    };

    // Decoding arbitrary frames must never panic, and anything that decodes
    // must be safe to route and draw.
    if let Ok(Some(event)) = decode(frame) {
        let mut store = SnapshotStore::default();
        let mut lifecycle = Lifecycle::default();
        ingest(event, &mut store, &mut lifecycle);
        if let Some(snapshot) = store.current() {
            let _ = render(snapshot, &RenderStyle::default());
        }
    }

    let _ = serde_json::from_str::<pong_view_client::protocol::InboundEvent>(frame);
});
