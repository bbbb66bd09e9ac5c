//! Blueprints as the listing page shows them: read, filtered by schedule
//! preset, and toggled on or off. Defining plans is left to the backend.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub cron_config: String,
    #[serde(default)]
    pub is_manual: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Blueprint {
    pub fn preset(&self) -> Option<CronPreset> {
        CronPreset::from_cron(&self.cron_config)
    }
}

/// One page of `GET /blueprints`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlueprintList {
    #[serde(default)]
    pub blueprints: Vec<Blueprint>,
    #[serde(default)]
    pub count: i64,
}

#[derive(Debug, Clone, Default)]
pub struct BlueprintQuery {
    pub enable: Option<bool>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl BlueprintQuery {
    pub(crate) fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(enable) = self.enable {
            pairs.push(("enable", enable.to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(size) = self.page_size {
            pairs.push(("pageSize", size.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CronPreset {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl CronPreset {
    pub const ALL: [CronPreset; 4] = [
        CronPreset::Hourly,
        CronPreset::Daily,
        CronPreset::Weekly,
        CronPreset::Monthly,
    ];

    pub fn cron_config(&self) -> &'static str {
        match self {
            CronPreset::Hourly => "59 * * * *",
            CronPreset::Daily => "0 0 * * *",
            CronPreset::Weekly => "0 0 * * 1",
            CronPreset::Monthly => "0 0 1 * *",
        }
    }

    pub fn from_cron(cron: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.cron_config() == cron)
    }
}

impl fmt::Display for CronPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CronPreset::Hourly => "hourly",
            CronPreset::Daily => "daily",
            CronPreset::Weekly => "weekly",
            CronPreset::Monthly => "monthly",
        };
        f.write_str(label)
    }
}

/// Listing filter: one preset, or every schedule that is not a preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlueprintFilter {
    Preset(CronPreset),
    Custom,
}

impl FromStr for BlueprintFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hourly" => Ok(BlueprintFilter::Preset(CronPreset::Hourly)),
            "daily" => Ok(BlueprintFilter::Preset(CronPreset::Daily)),
            "weekly" => Ok(BlueprintFilter::Preset(CronPreset::Weekly)),
            "monthly" => Ok(BlueprintFilter::Preset(CronPreset::Monthly)),
            "custom" => Ok(BlueprintFilter::Custom),
            other => Err(Error::validation(format!(
                "Unknown blueprint filter: '{}'. Available: hourly, daily, weekly, monthly, custom",
                other
            ))),
        }
    }
}

impl BlueprintFilter {
    pub fn matches(&self, blueprint: &Blueprint) -> bool {
        match self {
            BlueprintFilter::Preset(preset) => blueprint.cron_config == preset.cron_config(),
            BlueprintFilter::Custom => blueprint.preset().is_none(),
        }
    }
}

/// No filter keeps everything.
pub fn filter_blueprints(
    blueprints: &[Blueprint],
    filter: Option<BlueprintFilter>,
) -> Vec<&Blueprint> {
    blueprints
        .iter()
        .filter(|b| filter.map_or(true, |f| f.matches(b)))
        .collect()
}
