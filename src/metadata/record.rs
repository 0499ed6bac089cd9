//! Cycle metadata record and the tag vocabulary built on it.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Cycle metadata as returned by the portal.
///
/// Missing keys and explicit `null` values both decode to the zero value,
/// since a running cycle reports `null` for fields it has not reached yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataRecord {
    /// Portal cycle identifier
    #[serde(deserialize_with = "null_as_default")]
    pub id: i64,
    /// Overall cycle counter of the device
    #[serde(deserialize_with = "null_as_default")]
    pub cycle: i64,
    /// Device configuration revision
    #[serde(deserialize_with = "null_as_default")]
    pub device_config: i64,
    /// Grind cycle counter
    #[serde(deserialize_with = "null_as_default")]
    pub grind_cycle: i64,
    /// Steam cycle counter
    #[serde(deserialize_with = "null_as_default")]
    pub steam_cycle: i64,
    /// Waste category
    #[serde(deserialize_with = "null_as_default")]
    pub waste_type: String,
    /// Cycle type
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub kind: String,
    /// Cycle start, as sent by the portal
    #[serde(deserialize_with = "null_as_default")]
    pub start_time: String,
    /// Cycle end, empty while running
    #[serde(deserialize_with = "null_as_default")]
    pub end_time: String,
    /// Whether the cycle has finished
    #[serde(deserialize_with = "null_as_default")]
    pub completed: bool,
    /// Whether the cycle finished successfully
    #[serde(deserialize_with = "null_as_default")]
    pub successful: bool,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Metadata values that may be attached to metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortalTag {
    /// Portal cycle identifier
    Id,
    /// Overall cycle counter
    Cycle,
    /// Device configuration revision
    DeviceConfig,
    /// Grind cycle counter
    GrindCycle,
    /// Steam cycle counter
    SteamCycle,
    /// Waste category
    WasteType,
    /// Cycle type
    #[serde(rename = "type")]
    Type,
    /// Cycle start
    StartTime,
    /// Cycle end
    EndTime,
    /// Completion flag
    Completed,
    /// Success flag
    Successful,
}

impl PortalTag {
    /// Every tag in vocabulary order
    pub const ALL: [PortalTag; 11] = [
        PortalTag::Id,
        PortalTag::Cycle,
        PortalTag::DeviceConfig,
        PortalTag::GrindCycle,
        PortalTag::SteamCycle,
        PortalTag::WasteType,
        PortalTag::Type,
        PortalTag::StartTime,
        PortalTag::EndTime,
        PortalTag::Completed,
        PortalTag::Successful,
    ];

    /// Configuration name of the tag
    pub fn as_str(&self) -> &'static str {
        match self {
            PortalTag::Id => "id",
            PortalTag::Cycle => "cycle",
            PortalTag::DeviceConfig => "device_config",
            PortalTag::GrindCycle => "grind_cycle",
            PortalTag::SteamCycle => "steam_cycle",
            PortalTag::WasteType => "waste_type",
            PortalTag::Type => "type",
            PortalTag::StartTime => "start_time",
            PortalTag::EndTime => "end_time",
            PortalTag::Completed => "completed",
            PortalTag::Successful => "successful",
        }
    }
}

impl fmt::Display for PortalTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a cached value lands on a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attach {
    /// Integer field
    Field,
    /// String tag
    Tag,
}

/// Which cached value is attached to which measurement, and how
const ATTACH_RULES: &[(PortalTag, &str, Attach)] = &[
    (PortalTag::SteamCycle, "steam", Attach::Field),
    (PortalTag::Id, "steam", Attach::Tag),
    (PortalTag::GrindCycle, "grind", Attach::Field),
    (PortalTag::Id, "grind", Attach::Tag),
    (PortalTag::Id, "notification", Attach::Field),
];

/// Look up the attach rule for a tag on a measurement
pub fn attach_rule(tag: PortalTag, measurement: &str) -> Option<Attach> {
    ATTACH_RULES
        .iter()
        .find(|(t, m, _)| *t == tag && *m == measurement)
        .map(|(_, _, attach)| *attach)
}

/// Numeric metadata values kept between fetches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetadataCache {
    values: Option<CachedValues>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CachedValues {
    id: i64,
    steam_cycle: i64,
    grind_cycle: i64,
}

impl MetadataCache {
    /// Store the cacheable values of a record
    pub fn set(&mut self, record: &MetadataRecord) {
        self.values = Some(CachedValues {
            id: record.id,
            steam_cycle: record.steam_cycle,
            grind_cycle: record.grind_cycle,
        });
    }

    /// Cached value for a tag; only `id`, `steam_cycle` and `grind_cycle` are kept
    pub fn get(&self, tag: PortalTag) -> Option<i64> {
        let values = self.values?;
        match tag {
            PortalTag::Id => Some(values.id),
            PortalTag::SteamCycle => Some(values.steam_cycle),
            PortalTag::GrindCycle => Some(values.grind_cycle),
            _ => None,
        }
    }

    /// Returns true until a record has been stored
    pub fn is_empty(&self) -> bool {
        self.values.is_none()
    }

    /// Forget the cached record
    pub fn clear(&mut self) {
        self.values = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_from_json() {
        let json = r#"{
            "id": 17, "cycle": 3, "device_config": 2, "grind_cycle": 41,
            "steam_cycle": 12, "waste_type": "organic", "type": "steam",
            "start_time": "2024-05-01T10:00:00Z", "end_time": "",
            "completed": false, "successful": false
        }"#;
        let record: MetadataRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, 17);
        assert_eq!(record.kind, "steam");
        assert_eq!(record.steam_cycle, 12);
    }

    #[test]
    fn test_null_values_decode_to_defaults() {
        let json = r#"{"id":17,"steam_cycle":12,"grind_cycle":null,"end_time":null,"completed":false}"#;
        let record: MetadataRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, 17);
        assert_eq!(record.steam_cycle, 12);
        assert_eq!(record.grind_cycle, 0);
        assert_eq!(record.end_time, "");
        assert_eq!(record.kind, "");
    }

    #[test]
    fn test_attach_rules() {
        assert_eq!(attach_rule(PortalTag::SteamCycle, "steam"), Some(Attach::Field));
        assert_eq!(attach_rule(PortalTag::Id, "grind"), Some(Attach::Tag));
        assert_eq!(attach_rule(PortalTag::Id, "notification"), Some(Attach::Field));
        assert_eq!(attach_rule(PortalTag::SteamCycle, "grind"), None);
        assert_eq!(attach_rule(PortalTag::WasteType, "steam"), None);
    }

    #[test]
    fn test_cache_vocabulary() {
        let mut cache = MetadataCache::default();
        assert!(cache.is_empty());
        assert_eq!(cache.get(PortalTag::Id), None);

        cache.set(&MetadataRecord {
            id: 5,
            steam_cycle: 7,
            grind_cycle: 9,
            cycle: 99,
            ..MetadataRecord::default()
        });
        assert_eq!(cache.get(PortalTag::Id), Some(5));
        assert_eq!(cache.get(PortalTag::SteamCycle), Some(7));
        assert_eq!(cache.get(PortalTag::GrindCycle), Some(9));
        assert_eq!(cache.get(PortalTag::Cycle), None);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_tag_names_match_serde() {
        for tag in PortalTag::ALL {
            let yaml = serde_yaml::to_string(&tag).unwrap();
            assert_eq!(yaml.trim(), tag.as_str());
        }
    }
}
