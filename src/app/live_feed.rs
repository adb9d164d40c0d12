//! Live feed stream and start/stop notifications

use super::{emit, App, LiveFrameSlot};
use anomaly_watch::types::{BackendEvent, DecodedFrame};
use eframe::egui;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

impl App {
    pub(crate) fn start_live_feed(&mut self, ctx: &egui::Context) {
        let commands = self.controller.start_live_feed();
        self.run_commands(ctx, commands);
    }

    pub(crate) fn stop_live_feed(&mut self, ctx: &egui::Context) {
        let commands = self.controller.stop_live_feed();
        self.run_commands(ctx, commands);
    }

    pub(crate) fn spawn_live_stream(&mut self, ctx: &egui::Context, session: u64, url: String) {
        let token = CancellationToken::new();
        self.stream_tokens.insert(session, token.clone());

        let client = self.client.clone();
        let tx = self.events_tx.clone();
        let slot = self.live_slot.clone();
        let ctx = ctx.clone();

        info!(session, url = %url, "Opening live feed stream");

        self.runtime.spawn(async move {
            // Newest undecoded part; older ones are overwritten unseen
            let pending: Arc<Mutex<Option<Vec<u8>>>> = Arc::new(Mutex::new(None));
            let wake = Arc::new(Notify::new());
            let done = token.child_token();

            let decoder = tokio::spawn(decode_live_frames(
                session,
                token.clone(),
                pending.clone(),
                wake.clone(),
                done.clone(),
                slot,
                ctx.clone(),
            ));

            let result = client
                .stream_live_feed(&url, &token, |jpeg| {
                    if let Ok(mut latest) = pending.lock() {
                        *latest = Some(jpeg);
                    }
                    wake.notify_one();
                })
                .await;

            done.cancel();
            if let Err(e) = decoder.await {
                warn!(error = %e, session, "Live frame decoder task failed");
            }

            if token.is_cancelled() {
                debug!(session, "Live feed stream closed");
                return;
            }

            let error = match result {
                Ok(count) => {
                    info!(session, frames = count, "Live feed stream finished");
                    None
                }
                Err(e) => Some(e),
            };
            emit(&tx, &ctx, BackendEvent::LiveStreamEnded { session, error });
        });
    }

    pub(crate) fn close_live_stream(&mut self, session: u64) {
        if let Some(token) = self.stream_tokens.remove(&session) {
            debug!(session, "Cancelling live feed stream");
            token.cancel();
        }
        // Drop any frame the stream left behind
        if let Ok(mut latest) = self.live_slot.lock() {
            if matches!(latest.as_ref(), Some((s, _)) if *s == session) {
                *latest = None;
            }
        }
    }

    pub(crate) fn spawn_start_notify(&mut self, ctx: &egui::Context) {
        let client = self.client.clone();
        let tx = self.events_tx.clone();
        let ctx = ctx.clone();

        self.runtime.spawn(async move {
            let result = client.start_live_feed().await;
            emit(&tx, &ctx, BackendEvent::LiveFeedStarted(result));
        });
    }

    pub(crate) fn spawn_stop_notify(&mut self, ctx: &egui::Context) {
        let client = self.client.clone();
        let tx = self.events_tx.clone();
        let ctx = ctx.clone();

        self.runtime.spawn(async move {
            let result = client.stop_live_feed().await;
            emit(&tx, &ctx, BackendEvent::LiveFeedStopped(result));
        });
    }
}

/// Decode the newest pending JPEG off the async workers and publish it to the
/// live slot. Runs until `done` fires and nothing is left pending; stops
/// early once the session is `closed`.
async fn decode_live_frames(
    session: u64,
    closed: CancellationToken,
    pending: Arc<Mutex<Option<Vec<u8>>>>,
    wake: Arc<Notify>,
    done: CancellationToken,
    slot: LiveFrameSlot,
    ctx: egui::Context,
) {
    let mut last_repaint = Instant::now();
    let mut decode_failures = 0u64;

    loop {
        tokio::select! {
            _ = wake.notified() => {}
            _ = done.cancelled() => {}
        }

        let jpeg = pending.lock().ok().and_then(|mut latest| latest.take());
        let Some(jpeg) = jpeg else {
            if done.is_cancelled() {
                break;
            }
            continue;
        };

        let decoded = tokio::task::spawn_blocking(move || DecodedFrame::decode(jpeg)).await;
        match decoded {
            Ok(Ok(frame)) => {
                // A closed session's slot entry has already been cleared
                if closed.is_cancelled() {
                    break;
                }
                if let Ok(mut latest) = slot.lock() {
                    *latest = Some((session, frame));
                }
                // Cap repaint requests, the UI only shows the latest frame anyway
                if last_repaint.elapsed() >= Duration::from_millis(15) {
                    ctx.request_repaint();
                    last_repaint = Instant::now();
                }
            }
            Ok(Err(e)) => {
                decode_failures += 1;
                if decode_failures == 1 || decode_failures % 100 == 0 {
                    warn!(error = %e, decode_failures, "Dropping undecodable live frame");
                }
            }
            Err(e) => warn!(error = %e, "Live frame decode task failed"),
        }
    }
    // The last frame may have landed inside the throttle window
    ctx.request_repaint();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([10, 200, 90]));
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageFormat::Jpeg)
            .unwrap();
        out.into_inner()
    }

    async fn run_decoder(closed: CancellationToken, jpeg: Vec<u8>) -> LiveFrameSlot {
        let slot: LiveFrameSlot = Arc::new(Mutex::new(None));
        let pending = Arc::new(Mutex::new(Some(jpeg)));
        let wake = Arc::new(Notify::new());
        let done = closed.child_token();
        wake.notify_one();
        done.cancel();

        decode_live_frames(
            7,
            closed,
            pending,
            wake,
            done,
            slot.clone(),
            egui::Context::default(),
        )
        .await;
        slot
    }

    #[tokio::test]
    async fn pending_frame_is_decoded_before_decoder_exits() {
        let slot = run_decoder(CancellationToken::new(), jpeg(6, 4)).await;
        let latest = slot.lock().unwrap();
        let (session, frame) = latest.as_ref().expect("frame published");
        assert_eq!(*session, 7);
        assert_eq!((frame.width, frame.height), (6, 4));
    }

    #[tokio::test]
    async fn closed_session_publishes_nothing() {
        let closed = CancellationToken::new();
        closed.cancel();
        let slot = run_decoder(closed, jpeg(6, 4)).await;
        assert!(slot.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn undecodable_frame_is_dropped() {
        let slot = run_decoder(CancellationToken::new(), b"not a jpeg".to_vec()).await;
        assert!(slot.lock().unwrap().is_none());
    }
}
