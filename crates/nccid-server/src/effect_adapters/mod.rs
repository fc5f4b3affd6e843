// SPDX-License-Identifier: Apache-2.0

pub mod clock_adapters;
