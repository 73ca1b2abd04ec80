/*
 * This file is part of hpithres.
 *
 * Copyright (C) 2025 hpithres contributors
 *
 * hpithres is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * hpithres is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with hpithres. If not, see <https://www.gnu.org/licenses/>.
 */

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_ack_attempts() -> u32 { 10 }
fn default_ack_interval_ms() -> u64 { 1000 }
fn default_color() -> bool { true }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolConfig {
    /// How many times to poll for a hardware event after a threshold change.
    #[serde(default = "default_ack_attempts")]
    pub ack_attempts: u32,
    /// Pause between two polls.
    #[serde(default = "default_ack_interval_ms")]
    pub ack_interval_ms: u64,
    /// Inventory fixture served by the simulated session.
    #[serde(default)]
    pub inventory: Option<PathBuf>,
    #[serde(default)]
    pub logging: bool,
    #[serde(default)]
    pub log_path: Option<PathBuf>,
    #[serde(default = "default_color")]
    pub color: bool,
}

impl Default for ToolConfig {
    fn default() -> Self {
        ToolConfig {
            ack_attempts: default_ack_attempts(),
            ack_interval_ms: default_ack_interval_ms(),
            inventory: None,
            logging: false,
            log_path: None,
            color: default_color(),
        }
    }
}

impl ToolConfig {
    pub fn ack_interval(&self) -> Duration {
        Duration::from_millis(self.ack_interval_ms)
    }
}

pub fn config_path() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        return Path::new(&xdg).join("hpithres").join("config.json");
    }
    if let Ok(home) = env::var("HOME") {
        return Path::new(&home)
            .join(".config")
            .join("hpithres")
            .join("config.json");
    }
    PathBuf::from("/etc/hpithres/config.json")
}

pub fn validate_config(cfg: &ToolConfig) -> Result<(), String> {
    if cfg.ack_attempts == 0 || cfg.ack_attempts > 100 {
        return Err("ack_attempts must be in 1..=100".to_string());
    }
    if cfg.ack_interval_ms > 60_000 {
        return Err("ack_interval_ms must be at most 60000".to_string());
    }
    if let Some(p) = &cfg.inventory {
        if p.as_os_str().is_empty() { return Err("inventory path is empty".to_string()); }
    }
    if let Some(p) = &cfg.log_path {
        if p.as_os_str().is_empty() { return Err("log_path is empty".to_string()); }
    }
    Ok(())
}

/// Load and validate the config at `path`. A missing file yields defaults;
/// anything unreadable or invalid is an error.
pub fn load_config_from(path: &Path) -> Result<ToolConfig, String> {
    let data = match fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ToolConfig::default()),
        Err(e) => return Err(format!("{}: {}", path.display(), e)),
    };
    let cfg: ToolConfig = serde_json::from_str(&data)
        .map_err(|e| format!("{}: parse error: {}", path.display(), e))?;
    validate_config(&cfg)?;
    Ok(cfg)
}

pub fn load_config() -> Result<ToolConfig, String> {
    load_config_from(&config_path())
}
