//! Trigger source: synthesizes the user text that starts a run.

use std::fmt::Write as _;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;

use td_domain::config::{AgentConfig, TriggerConfig, TriggerMode};
use td_domain::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct TriggerSource {
    cfg: TriggerConfig,
    tz: Tz,
}

impl TriggerSource {
    pub fn from_config(trigger: &TriggerConfig, agent: &AgentConfig) -> Result<Self> {
        if trigger.mode == TriggerMode::Timestamp
            && StrftimeItems::new(&trigger.timestamp_format).any(|item| matches!(item, Item::Error))
        {
            return Err(Error::Config(format!(
                "trigger.timestamp_format '{}' is not a valid strftime format",
                trigger.timestamp_format
            )));
        }
        if trigger.mode == TriggerMode::Fixed && trigger.fixed_text.is_empty() {
            return Err(Error::Config("trigger.fixed_text must be set in fixed mode".into()));
        }
        Ok(Self {
            cfg: trigger.clone(),
            tz: agent.tz()?,
        })
    }

    /// Trigger text for the current instant.
    pub fn next_text(&self) -> String {
        self.text_at(Utc::now())
    }

    pub fn text_at(&self, now: DateTime<Utc>) -> String {
        let local = now.with_timezone(&self.tz);
        match self.cfg.mode {
            TriggerMode::Sentinel => {
                if local.hour() <= self.cfg.noon_cutoff_hour {
                    self.cfg.morning.clone()
                } else {
                    self.cfg.evening.clone()
                }
            }
            TriggerMode::Timestamp => {
                let mut out = String::new();
                if write!(out, "{}", local.format(&self.cfg.timestamp_format)).is_err() {
                    // Some specifiers only fail when rendered.
                    out = local.to_rfc3339();
                }
                out
            }
            TriggerMode::Fixed => self.cfg.fixed_text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn source(mode: TriggerMode, tz: &str) -> TriggerSource {
        let trigger = TriggerConfig {
            mode,
            fixed_text: "GO".into(),
            ..TriggerConfig::default()
        };
        let agent = AgentConfig {
            timezone: tz.into(),
            ..AgentConfig::default()
        };
        TriggerSource::from_config(&trigger, &agent).unwrap()
    }

    #[test]
    fn noon_still_counts_as_morning() {
        let src = source(TriggerMode::Sentinel, "UTC");
        let at = |h, m| Utc.with_ymd_and_hms(2026, 10, 19, h, m, 0).unwrap();
        assert_eq!(src.text_at(at(0, 0)), "SEND_MORNING");
        assert_eq!(src.text_at(at(12, 59)), "SEND_MORNING");
        assert_eq!(src.text_at(at(13, 0)), "SEND_EVENING");
        assert_eq!(src.text_at(at(23, 59)), "SEND_EVENING");
    }

    #[test]
    fn sentinel_uses_configured_timezone() {
        // 08:00 UTC is 13:30 in Kolkata.
        let src = source(TriggerMode::Sentinel, "Asia/Kolkata");
        let t = Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap();
        assert_eq!(src.text_at(t), "SEND_EVENING");
    }

    #[test]
    fn timestamp_mode_formats_local_time() {
        let src = source(TriggerMode::Timestamp, "Asia/Kolkata");
        let t = Utc.with_ymd_and_hms(2026, 10, 19, 8, 0, 0).unwrap();
        assert_eq!(src.text_at(t), "2026-10-19 13:30:00 IST");
    }

    #[test]
    fn fixed_mode_returns_configured_text() {
        let src = source(TriggerMode::Fixed, "UTC");
        assert_eq!(src.next_text(), "GO");
    }

    #[test]
    fn invalid_timestamp_format_is_rejected() {
        let trigger = TriggerConfig {
            mode: TriggerMode::Timestamp,
            timestamp_format: "%Q".into(),
            ..TriggerConfig::default()
        };
        assert!(TriggerSource::from_config(&trigger, &AgentConfig::default()).is_err());
    }
}
