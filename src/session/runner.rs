//! Render loop driver for a session

use std::future::Future;

use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use crate::util::time::{frame_duration, Timer};

use super::{Renderer, Session};

/// Tick `session` at the render rate until `shutdown` resolves, then close it.
///
/// Channel events are queued between ticks and drained at the start of each
/// one, so a tick always sees every update that arrived before it.
pub async fn run<R, F>(mut session: Session, renderer: &mut R, shutdown: F) -> Session
where
    R: Renderer,
    F: Future<Output = ()>,
{
    info!(seat = %session.local(), "render loop started");

    let clock = Timer::new();
    let mut ticker = interval(frame_duration());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                session.tick(clock.now_ms(), &mut *renderer);
            }
            _ = &mut shutdown => {
                info!(seat = %session.local(), "render loop stopping");
                break;
            }
        }
    }

    session.close();
    session
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LinkConfig;
    use crate::link::{MemoryBroker, PeerLinkState};
    use crate::motion::Pose;
    use crate::session::EntityRef;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingScene {
        reads: usize,
        applies: usize,
    }

    impl Renderer for CountingScene {
        fn read_local_pose(&mut self, _entity: &EntityRef) -> Pose {
            self.reads += 1;
            Pose::default()
        }

        fn apply_pose(&mut self, _entity: &EntityRef, _pose: &Pose) {
            self.applies += 1;
        }
    }

    #[tokio::test]
    async fn test_run_ticks_until_shutdown() {
        let broker = MemoryBroker::new();
        let config = LinkConfig::new("driver:0".parse().unwrap()).with_proxy_url("mem://broker");
        let session = Session::new(config, &broker).unwrap();

        let mut scene = CountingScene::default();
        let session = run(session, &mut scene, tokio::time::sleep(Duration::from_millis(100))).await;

        assert!(scene.reads >= 2, "only {} ticks", scene.reads);
        // Three followed seats are applied every tick.
        assert_eq!(scene.applies, scene.reads * 3);
        assert!(session
            .link_states()
            .iter()
            .all(|(_, state)| *state == PeerLinkState::Disconnected));
    }
}
