// Copyright 2025 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;
use super::key::TcbInfoKey;
use super::measurement::TcbInfoMeasurement;
use super::value::TcbInfoValue;
use multimap::MultiMap;

/// Collects the measurements reported across a certificate chain.  A
/// component may be reported more than once, but only with the same value.
#[derive(Debug, Default)]
pub struct TcbInfoAggregator {
    m: MultiMap<TcbInfoKey, TcbInfoValue>,
}

impl TcbInfoAggregator {
    pub fn new() -> Self {
        Self {
            m: Default::default(),
        }
    }

    pub fn add(&mut self, measurement: TcbInfoMeasurement) -> Result<(), Error> {
        if let Some(known) = self.m.get_vec(&measurement.key) {
            if let Some(other) = known.iter().find(|v| **v != measurement.value) {
                return Err(Error::Conflict(format!(
                    "{} reported as both {} and {}",
                    measurement.key, other, measurement.value
                )));
            }

            return Ok(());
        }

        self.m.insert(measurement.key, measurement.value);

        Ok(())
    }

    pub fn add_all<I>(&mut self, measurements: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = TcbInfoMeasurement>,
    {
        for m in measurements {
            self.add(m)?;
        }

        Ok(())
    }

    pub fn measurements(&self) -> Vec<TcbInfoMeasurement> {
        self.m
            .iter_all()
            .flat_map(|(k, vs)| {
                vs.iter()
                    .map(|v| TcbInfoMeasurement::new(k.clone(), v.clone()))
            })
            .collect()
    }
}
