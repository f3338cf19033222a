//! Fuzz target: `MessageRouter::on_message`
//!
//! Sends arbitrary payloads to every subscribed channel and asserts that
//! routing never panics and only ever changes the state through a
//! reported `AlarmChanged` event.
//!
//! cargo fuzz run fuzz_router

#![no_main]

use libfuzzer_sys::fuzz_target;
use warnbadge::app::events::AppEvent;
use warnbadge::app::ports::EventSink;
use warnbadge::app::router::MessageRouter;
use warnbadge::app::state::StateStore;
use warnbadge::config::BadgeConfig;
use warnbadge::topics::Topics;

#[derive(Default)]
struct Changes(u32);

impl EventSink for Changes {
    fn emit(&mut self, event: &AppEvent) {
        if matches!(event, AppEvent::AlarmChanged { .. }) {
            self.0 += 1;
        }
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(topics) = Topics::new(&BadgeConfig::default()) else {
        return;
    };
    let router = MessageRouter::new(topics);

    for topic in router.topics().subscriptions() {
        let mut store = StateStore::new();
        let mut changes = Changes::default();
        let before = store.get();

        router.on_message(topic, data, &mut store, &mut changes);

        let changed = store.get() != before;
        assert_eq!(changed, changes.0 == 1, "state changed without an event");
        assert!(changes.0 <= 1, "one message changes state at most once");
    }
});
