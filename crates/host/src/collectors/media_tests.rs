use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::*;
use crate::session::Session;

fn sample(position: i64) -> NowPlaying {
    NowPlaying {
        title: "Song".to_owned(),
        artist: "Artist".to_owned(),
        album: "Album".to_owned(),
        application: "Player".to_owned(),
        is_playing: true,
        duration: 200,
        position,
    }
}

struct SequenceProbe {
    now_playing: Vec<NowPlaying>,
    call: AtomicUsize,
}

impl MediaProbe for SequenceProbe {
    fn now_playing(&self) -> anyhow::Result<NowPlaying> {
        let i = self.call.fetch_add(1, Ordering::Relaxed).min(self.now_playing.len() - 1);
        Ok(self.now_playing[i].clone())
    }

    fn audio_capabilities(&self) -> anyhow::Result<MediaCapabilities> {
        Ok(MediaCapabilities { volume: Some(0.5), muted: Some(false) })
    }
}

struct FailingProbe;

impl MediaProbe for FailingProbe {
    fn now_playing(&self) -> anyhow::Result<NowPlaying> {
        anyhow::bail!("no media session")
    }

    fn audio_capabilities(&self) -> anyhow::Result<MediaCapabilities> {
        anyhow::bail!("no audio endpoint")
    }
}

async fn joined_session(rooms: &Arc<RoomRegistry>, scope: &CancellationToken) -> (Arc<Session>, tokio::sync::mpsc::Receiver<crate::wire::OutboundFrame>) {
    let (session, out) = Session::new("127.0.0.1:1".to_owned(), scope);
    rooms.add_client_to_room(ROOM, &session).await;
    (session, out)
}

#[tokio::test]
async fn first_emit_always_includes_now_playing() {
    let rooms = Arc::new(RoomRegistry::new());
    let scope = CancellationToken::new();
    let (_session, mut out) = joined_session(&rooms, &scope).await;

    let probe = SequenceProbe { now_playing: vec![sample(10)], call: AtomicUsize::new(0) };
    let collector = MediaCollector::new(Arc::new(probe), rooms, scope);
    collector.emit().await;

    let frame = out.recv().await.expect("media frame");
    assert_eq!(frame.data["nowPlaying"]["title"], "Song");
    assert_eq!(frame.data["mediaCapabilities"]["volume"], 0.5);
}

#[tokio::test]
async fn near_identical_tick_suppresses_now_playing_but_keeps_capabilities() {
    let rooms = Arc::new(RoomRegistry::new());
    let scope = CancellationToken::new();
    let (_session, mut out) = joined_session(&rooms, &scope).await;

    let probe = SequenceProbe { now_playing: vec![sample(10), sample(11)], call: AtomicUsize::new(0) };
    let collector = MediaCollector::new(Arc::new(probe), rooms, scope);
    collector.emit().await;
    out.recv().await.expect("first frame");

    collector.emit().await;
    let frame = out.recv().await.expect("second frame");
    assert!(frame.data.get("nowPlaying").is_none());
    assert_eq!(frame.data["mediaCapabilities"]["volume"], 0.5);
}

#[tokio::test]
async fn changed_track_is_re_emitted() {
    let rooms = Arc::new(RoomRegistry::new());
    let scope = CancellationToken::new();
    let (_session, mut out) = joined_session(&rooms, &scope).await;

    let mut second = sample(10);
    second.title = "Other Song".to_owned();
    let probe = SequenceProbe { now_playing: vec![sample(10), second], call: AtomicUsize::new(0) };
    let collector = MediaCollector::new(Arc::new(probe), rooms, scope);
    collector.emit().await;
    out.recv().await.expect("first frame");

    collector.emit().await;
    let frame = out.recv().await.expect("second frame");
    assert_eq!(frame.data["nowPlaying"]["title"], "Other Song");
}

#[tokio::test]
async fn both_probes_failing_skips_broadcast_entirely() {
    let rooms = Arc::new(RoomRegistry::new());
    let scope = CancellationToken::new();
    let (_session, mut out) = joined_session(&rooms, &scope).await;

    let collector = MediaCollector::new(Arc::new(FailingProbe), rooms, scope);
    collector.emit().await;

    assert!(out.try_recv().is_err());
}
