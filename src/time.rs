// This file is part of orcfax-indexer.
// Copyright (C) 2026 Orcfax
// SPDX-License-Identifier: Apache-2.0
// Licensed under the Apache License, Version 2.0 (the "License");
// You may not use this file except in compliance with the License.
// You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Time Base (spec.md §4.1): conversion between wall-clock milliseconds and the
//! chain's logical slot numbers. All arithmetic is integer; slots are a uniform
//! linear clock with no DST/timezone correction.

/// The per-network parameters `(zero_time, zero_slot, slot_length)` needed to convert
/// between slots and dates.
#[derive(Debug, Clone, Copy)]
pub struct SlotClock {
    pub zero_time: i64,
    pub zero_slot: i64,
    pub slot_length: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    Week,
    Month,
}

impl Period {
    /// Duration expressed in milliseconds. Month is treated as 30 days, matching a
    /// uniform linear clock with no calendar corrections.
    fn millis(self) -> i64 {
        match self {
            Period::Day => 24 * 60 * 60 * 1000,
            Period::Week => 7 * 24 * 60 * 60 * 1000,
            Period::Month => 30 * 24 * 60 * 60 * 1000,
        }
    }
}

impl SlotClock {
    pub fn slot_to_date(&self, slot: i64) -> i64 {
        self.zero_time + (slot - self.zero_slot) * self.slot_length
    }

    pub fn date_to_slot(&self, date_ms: i64) -> i64 {
        self.zero_slot + (date_ms - self.zero_time).div_euclid(self.slot_length)
    }

    pub fn slot_after_time_period(&self, slot: i64, period: Period) -> i64 {
        slot + period.millis() / self.slot_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLOCK: SlotClock = SlotClock {
        zero_time: 1_596_059_091_000,
        zero_slot: 4_492_800,
        slot_length: 1_000,
    };

    #[test]
    fn slot_to_date_is_linear() {
        assert_eq!(CLOCK.slot_to_date(CLOCK.zero_slot), CLOCK.zero_time);
        assert_eq!(
            CLOCK.slot_to_date(CLOCK.zero_slot + 10),
            CLOCK.zero_time + 10_000
        );
    }

    #[test]
    fn round_trip_holds_for_every_slot_at_or_after_zero() {
        for slot in [CLOCK.zero_slot, CLOCK.zero_slot + 1, CLOCK.zero_slot + 86_400] {
            let date = CLOCK.slot_to_date(slot);
            assert_eq!(CLOCK.date_to_slot(date), slot);
        }
    }

    #[test]
    fn slot_after_day_advances_by_86400_slots_at_one_second_slots() {
        let next = CLOCK.slot_after_time_period(CLOCK.zero_slot, Period::Day);
        assert_eq!(next, CLOCK.zero_slot + 86_400);
    }
}
