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

//! Generated contract bindings

#![allow(missing_docs)]

/// Entry point nonce oracle
pub mod i_entry_point {
    use ethers::contract::abigen;

    abigen!(
        IEntryPoint,
        r#"[
            function getNonce(address sender, uint192 key) external view returns (uint256 nonce)
        ]"#
    );
}
