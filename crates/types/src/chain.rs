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

//! Grouped/labeled chain IDs for various networks

use ethers::types::Chain;

/// Known chain IDs for the Polygon ecosystem
pub const POLYGON_CHAIN_IDS: &[u64] = &[Chain::Polygon as u64, Chain::PolygonMumbai as u64];

/// Known chain IDs for the Arbitrum ecosystem
pub const ARBITRUM_CHAIN_IDS: &[u64] = &[
    Chain::Arbitrum as u64,
    Chain::ArbitrumGoerli as u64,
    421614, /* ArbitrumSepolia */
    Chain::ArbitrumNova as u64,
];

/// Known chain IDs for the Celo ecosystem
pub const CELO_CHAIN_IDS: &[u64] = &[42220 /* Celo */, 44787 /* CeloAlfajores */];

/// Known chain IDs for the Avalanche ecosystem
pub const AVALANCHE_CHAIN_IDS: &[u64] = &[43114 /* Avalanche */, 43113 /* AvalancheFuji */];

/// Known chain IDs for the DFK chain
pub const DFK_CHAIN_IDS: &[u64] = &[53935 /* DFK */];
