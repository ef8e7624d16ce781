// This file is part of Bindle.
//
// Bindle is free software: you can redistribute it and/or modify it under the
// terms of the GNU Lesser General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version.
//
// Bindle is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with Bindle.
// If not, see https://www.gnu.org/licenses/.

use anyhow::Context;
use bindle_types::GasFees;
use ethers::types::{Chain, U256};
use serde::Deserialize;

const POLYGON_GAS_STATION_URL: &str = "https://gasstation.polygon.technology/v2";
const MUMBAI_GAS_STATION_URL: &str = "https://gasstation-testnet.polygon.technology/v2";

/// Client for the Polygon gas station fee oracle
#[derive(Debug)]
pub(crate) struct GasStation {
    client: reqwest::Client,
    url: &'static str,
}

#[derive(Debug, Deserialize)]
struct GasStationResponse {
    fast: GasStationEstimate,
}

/// Fees reported by the gas station, in gwei
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GasStationEstimate {
    max_fee_per_gas: f64,
    max_priority_fee_per_gas: f64,
}

impl GasStation {
    /// The gas station serving the given chain, if there is one
    pub(crate) fn for_chain(chain_id: u64) -> Option<Self> {
        let url = if chain_id == Chain::Polygon as u64 {
            POLYGON_GAS_STATION_URL
        } else if chain_id == Chain::PolygonMumbai as u64 {
            MUMBAI_GAS_STATION_URL
        } else {
            return None;
        };
        Some(Self {
            client: reqwest::Client::new(),
            url,
        })
    }

    /// Fetch the current fast fees, converted to wei
    pub(crate) async fn fetch(&self) -> anyhow::Result<GasFees> {
        let response: GasStationResponse = self
            .client
            .get(self.url)
            .send()
            .await
            .context("gas station request should succeed")?
            .error_for_status()
            .context("gas station should return a success status")?
            .json()
            .await
            .context("gas station response should parse")?;

        Ok(GasFees {
            max_fee_per_gas: gwei_to_wei(response.fast.max_fee_per_gas),
            max_priority_fee_per_gas: gwei_to_wei(response.fast.max_priority_fee_per_gas),
        })
    }
}

fn gwei_to_wei(gwei: f64) -> U256 {
    U256::from((gwei * 1e9) as u128)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response() {
        let json = r#"{
            "safeLow": { "maxFeePerGas": 30.1, "maxPriorityFeePerGas": 30.0 },
            "fast": { "maxFeePerGas": 50.0, "maxPriorityFeePerGas": 40.5 },
            "estimatedBaseFee": 0.12,
            "blockTime": 2,
            "blockNumber": 52349336
        }"#;
        let response: GasStationResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            gwei_to_wei(response.fast.max_fee_per_gas),
            U256::from(50_000_000_000_u64)
        );
        assert_eq!(
            gwei_to_wei(response.fast.max_priority_fee_per_gas),
            U256::from(40_500_000_000_u64)
        );
    }

    #[test]
    fn test_station_selection() {
        assert!(GasStation::for_chain(Chain::Polygon as u64).is_some());
        assert!(GasStation::for_chain(Chain::PolygonMumbai as u64).is_some());
        assert!(GasStation::for_chain(1).is_none());
    }
}
