use std::time::Duration;

use chrono::{DateTime, Datelike, Days, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::{NotificationError, Result};
use crate::weekday::Weekday;

/// When a notification should fire, as requested by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationType {
    TimeInterval {
        delay_secs: f64,
        repeats: bool,
    },
    /// Matches every day at `hour:minute` unless a weekday is given.
    Calendar {
        weekday: Option<Weekday>,
        hour: u32,
        minute: u32,
        repeats: bool,
    },
    #[cfg(feature = "region")]
    Region {
        region: CircularRegion,
        notify_on_entry: bool,
        notify_on_exit: bool,
        repeats: bool,
    },
}

impl NotificationType {
    pub fn after(delay: Duration) -> Self {
        Self::TimeInterval {
            delay_secs: delay.as_secs_f64(),
            repeats: false,
        }
    }

    pub fn every(interval: Duration) -> Self {
        Self::TimeInterval {
            delay_secs: interval.as_secs_f64(),
            repeats: true,
        }
    }

    pub fn daily(hour: u32, minute: u32) -> Self {
        Self::Calendar {
            weekday: None,
            hour,
            minute,
            repeats: true,
        }
    }

    pub fn weekly(weekday: Weekday, hour: u32, minute: u32) -> Self {
        Self::Calendar {
            weekday: Some(weekday),
            hour,
            minute,
            repeats: true,
        }
    }

    pub fn repeats(&self) -> bool {
        match self {
            Self::TimeInterval { repeats, .. } | Self::Calendar { repeats, .. } => *repeats,
            #[cfg(feature = "region")]
            Self::Region { repeats, .. } => *repeats,
        }
    }

    pub fn calendar_time(&self) -> Option<(u32, u32)> {
        match self {
            Self::Calendar { hour, minute, .. } => Some((*hour, *minute)),
            _ => None,
        }
    }

    /// Repeating calendar trigger on `day` at this trigger's time of day.
    /// `None` for triggers without a time of day.
    pub fn for_weekday(&self, day: Weekday) -> Option<Self> {
        let (hour, minute) = self.calendar_time()?;
        Some(Self::weekly(day, hour, minute))
    }
}

#[cfg(feature = "region")]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircularRegion {
    pub identifier: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: f64,
}

/// Minimum intervals enforced by the OS for time-interval triggers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalFloors {
    pub repeating_secs: f64,
    pub one_shot_secs: f64,
}

impl Default for IntervalFloors {
    fn default() -> Self {
        Self {
            repeating_secs: 60.0,
            one_shot_secs: 0.1,
        }
    }
}

pub fn effective_interval(requested: f64, repeats: bool, floors: IntervalFloors) -> f64 {
    let floor = if repeats {
        floors.repeating_secs
    } else {
        floors.one_shot_secs
    };
    requested.max(floor)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateComponents {
    pub weekday: Option<Weekday>,
    pub hour: u32,
    pub minute: u32,
}

/// Trigger in the form handed to the OS store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlatformTrigger {
    TimeInterval {
        interval_secs: f64,
        repeats: bool,
    },
    Calendar {
        components: DateComponents,
        repeats: bool,
    },
    #[cfg(feature = "region")]
    Region {
        region: CircularRegion,
        notify_on_entry: bool,
        notify_on_exit: bool,
        repeats: bool,
    },
}

impl PlatformTrigger {
    pub fn repeats(&self) -> bool {
        match self {
            Self::TimeInterval { repeats, .. } | Self::Calendar { repeats, .. } => *repeats,
            #[cfg(feature = "region")]
            Self::Region { repeats, .. } => *repeats,
        }
    }

    /// Next instant after `now` at which this trigger fires. Region triggers
    /// have no computable fire date.
    pub fn next_trigger_date<Tz: TimeZone>(&self, now: DateTime<Tz>) -> Option<DateTime<Tz>> {
        match self {
            Self::TimeInterval { interval_secs, .. } => {
                let delay = Duration::try_from_secs_f64(*interval_secs).ok()?;
                let delay = chrono::Duration::from_std(delay).ok()?;
                now.checked_add_signed(delay)
            }
            Self::Calendar { components, .. } => next_calendar_match(&now, components),
            #[cfg(feature = "region")]
            Self::Region { .. } => None,
        }
    }
}

fn next_calendar_match<Tz: TimeZone>(
    now: &DateTime<Tz>,
    components: &DateComponents,
) -> Option<DateTime<Tz>> {
    let local_now = now.naive_local();
    let tz = now.timezone();
    // Two weeks covers a weekday match even when a DST gap swallows the first one.
    for offset in 0..15u64 {
        let date = local_now.date().checked_add_days(Days::new(offset))?;
        if let Some(day) = components.weekday {
            if Weekday::from(date.weekday()) != day {
                continue;
            }
        }
        let candidate = date.and_hms_opt(components.hour, components.minute, 0)?;
        if candidate <= local_now {
            continue;
        }
        if let Some(resolved) = tz.from_local_datetime(&candidate).earliest() {
            return Some(resolved);
        }
    }
    None
}

/// Turns a requested [`NotificationType`] into a [`PlatformTrigger`].
pub trait TriggerBuilder: Send + Sync {
    fn build(
        &self,
        id: &str,
        kind: &NotificationType,
        weekday_override: Option<Weekday>,
    ) -> Result<PlatformTrigger>;
}

#[derive(Debug, Clone, Default)]
pub struct StandardTriggerBuilder {
    floors: IntervalFloors,
}

impl StandardTriggerBuilder {
    pub fn new(floors: IntervalFloors) -> Self {
        Self { floors }
    }
}

impl TriggerBuilder for StandardTriggerBuilder {
    fn build(
        &self,
        id: &str,
        kind: &NotificationType,
        weekday_override: Option<Weekday>,
    ) -> Result<PlatformTrigger> {
        match kind {
            NotificationType::TimeInterval {
                delay_secs,
                repeats,
            } => {
                if weekday_override.is_some() {
                    return Err(NotificationError::trigger(
                        id,
                        "weekday override requires a calendar trigger",
                    ));
                }
                if !delay_secs.is_finite() {
                    return Err(NotificationError::trigger(
                        id,
                        format!("interval {delay_secs} is not a finite number of seconds"),
                    ));
                }
                let interval_secs = effective_interval(*delay_secs, *repeats, self.floors);
                if interval_secs != *delay_secs {
                    tracing::warn!(
                        id,
                        requested = delay_secs,
                        effective = interval_secs,
                        repeats,
                        "interval raised to platform minimum"
                    );
                }
                Ok(PlatformTrigger::TimeInterval {
                    interval_secs,
                    repeats: *repeats,
                })
            }
            NotificationType::Calendar {
                weekday,
                hour,
                minute,
                repeats,
            } => {
                if *hour > 23 || *minute > 59 {
                    return Err(NotificationError::trigger(
                        id,
                        format!("{hour:02}:{minute:02} is not a valid time of day"),
                    ));
                }
                Ok(PlatformTrigger::Calendar {
                    components: DateComponents {
                        weekday: weekday_override.or(*weekday),
                        hour: *hour,
                        minute: *minute,
                    },
                    repeats: *repeats,
                })
            }
            #[cfg(feature = "region")]
            NotificationType::Region {
                region,
                notify_on_entry,
                notify_on_exit,
                repeats,
            } => {
                if weekday_override.is_some() {
                    return Err(NotificationError::trigger(
                        id,
                        "weekday override requires a calendar trigger",
                    ));
                }
                if !(region.radius_m.is_finite() && region.radius_m > 0.0) {
                    return Err(NotificationError::trigger(
                        id,
                        format!("region radius {} must be positive", region.radius_m),
                    ));
                }
                Ok(PlatformTrigger::Region {
                    region: region.clone(),
                    notify_on_entry: *notify_on_entry,
                    notify_on_exit: *notify_on_exit,
                    repeats: *repeats,
                })
            }
        }
    }
}
