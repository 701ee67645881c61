// Copyright (c) The tap-runner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Environment variables passed to the test program.

use serde::Deserialize;
use std::{
    collections::{BTreeMap, btree_map},
    ffi::OsString,
    process::Command,
};

/// Environment variables to set when running the test program.
///
/// These are applied on top of the environment inherited from the current
/// process. On a key collision the value in this map wins.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentMap {
    map: BTreeMap<String, String>,
}

impl EnvironmentMap {
    /// Creates an empty `EnvironmentMap`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a variable, replacing any earlier value for the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.map.insert(name.into(), value.into());
    }

    /// Returns the value set for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }

    /// Returns true if no overrides are set.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the number of overrides.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Iterates over the overrides in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merges these overrides over an inherited environment.
    ///
    /// Every variable in `inherited` is kept unless this map sets the same
    /// name, in which case this map's value is used. Variables only present
    /// in this map are added.
    pub fn merge_over<I, K, V>(&self, inherited: I) -> BTreeMap<OsString, OsString>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        let mut merged: BTreeMap<OsString, OsString> = inherited
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        for (name, value) in &self.map {
            merged.insert(name.into(), value.into());
        }
        merged
    }

    /// Applies the overrides to a command.
    ///
    /// The command keeps inheriting the ambient environment, so the result is
    /// the same as [`Self::merge_over`] applied to [`std::env::vars_os`].
    pub(crate) fn apply_env(&self, command: &mut Command) {
        for (name, value) in &self.map {
            command.env(name, value);
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvironmentMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            map: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for EnvironmentMap {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        self.map
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

impl IntoIterator for EnvironmentMap {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.map.into_iter()
    }
}
