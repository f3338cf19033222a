//! MQTT topic naming.
//!
//! Badge channels follow `<namespace>/<device-type>/<badge>/<direction>`;
//! shadow channels live under the broker's reserved
//! `$aws/things/<thing>/shadow/name/<shadow>/` prefix.
//!
//! | Channel               | Direction | Payload                      |
//! |-----------------------|-----------|------------------------------|
//! | `<ns>/<type>/<n>/down`| subscribe | `{"command": ...}`           |
//! | `<ns>/<type>`         | subscribe | `{"command": ...}` broadcast |
//! | `<shadow>/get/accepted`| subscribe | shadow document             |
//! | `<ns>/<type>/<n>/up`  | publish   | status report                |
//! | `<shadow>/get`        | publish   | empty (requests desired)     |
//! | `<shadow>/update`     | publish   | reported-state mirror        |

use core::fmt::Write;

use crate::config::BadgeConfig;
use crate::error::ConfigError;

/// Longest topic we ever build or match.
pub const MAX_TOPIC_LEN: usize = 128;

pub type TopicString = heapless::String<MAX_TOPIC_LEN>;

/// What an inbound topic means to the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    DeviceCommand,
    BroadcastCommand,
    ShadowGetAccepted,
    Unknown,
}

/// Every topic the badge publishes or subscribes to, derived once at startup.
#[derive(Debug, Clone)]
pub struct Topics {
    pub device_down: TopicString,
    pub device_up: TopicString,
    pub broadcast_down: TopicString,
    pub shadow_get: TopicString,
    pub shadow_get_accepted: TopicString,
    pub shadow_update: TopicString,
}

impl Topics {
    pub fn new(config: &BadgeConfig) -> Result<Self, ConfigError> {
        let badge_base = format_topic(format_args!(
            "{}/{}/{}",
            config.topic_namespace, config.device_type, config.badge_number
        ))?;
        let thing = config.thing_name()?;
        let shadow_prefix = format_topic(format_args!(
            "$aws/things/{}/shadow/name/{}/",
            thing, config.shadow_name
        ))?;

        Ok(Self {
            device_down: format_topic(format_args!("{badge_base}/down"))?,
            device_up: format_topic(format_args!("{badge_base}/up"))?,
            broadcast_down: format_topic(format_args!(
                "{}/{}",
                config.topic_namespace, config.device_type
            ))?,
            shadow_get: format_topic(format_args!("{shadow_prefix}get"))?,
            shadow_get_accepted: format_topic(format_args!("{shadow_prefix}get/accepted"))?,
            shadow_update: format_topic(format_args!("{shadow_prefix}update"))?,
        })
    }

    /// The fixed subscription set, re-registered on every new session.
    pub fn subscriptions(&self) -> [&str; 3] {
        [
            self.device_down.as_str(),
            self.broadcast_down.as_str(),
            self.shadow_get_accepted.as_str(),
        ]
    }

    pub fn classify(&self, topic: &str) -> Channel {
        if topic == self.device_down.as_str() {
            Channel::DeviceCommand
        } else if topic == self.broadcast_down.as_str() {
            Channel::BroadcastCommand
        } else if topic == self.shadow_get_accepted.as_str() {
            Channel::ShadowGetAccepted
        } else {
            Channel::Unknown
        }
    }
}

fn format_topic(args: core::fmt::Arguments<'_>) -> Result<TopicString, ConfigError> {
    let mut topic = TopicString::new();
    topic
        .write_fmt(args)
        .map_err(|_| ConfigError::TooLong("topic"))?;
    Ok(topic)
}
