// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::CredentialSettings;
use crate::engines::traits::{CredentialSource, Credentials};
use std::collections::HashMap;

/// 基于配置的凭据来源
///
/// 凭据来自配置文件或 `USAGE_SCRAPER__CREDENTIALS__<KEY>__USERNAME` 等环境变量
#[derive(Clone, Default)]
pub struct SettingsCredentialSource {
    entries: HashMap<String, CredentialSettings>,
}

impl SettingsCredentialSource {
    pub fn new(entries: HashMap<String, CredentialSettings>) -> Self {
        // config 会把环境变量中的键转为小写
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        Self { entries }
    }
}

impl CredentialSource for SettingsCredentialSource {
    fn credentials(&self, key: &str) -> Option<Credentials> {
        self.entries
            .get(&key.to_lowercase())
            .map(|entry| Credentials {
                username: entry.username.clone(),
                password: entry.password.clone(),
            })
    }
}
