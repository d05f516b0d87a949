//! Match metrics collection for balance analysis.
//!
//! A [`MetricsCollector`] watches a battle tick by tick and produces a
//! [`MatchSummary`]; [`BatchSummary`] aggregates many of them.

use std::collections::BTreeMap;

use lane_core::components::EntityId;
use lane_core::factions::Side;
use lane_core::simulation::{Battle, TickEvents};
use lane_core::unit_kind::UnitKind;
use serde::{Deserialize, Serialize};

/// How a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EndCondition {
    /// A primary tower fell.
    KingDestroyed,
    /// The scenario time limit passed first.
    TimeLimit,
    /// The run was stopped from outside.
    #[default]
    Stopped,
}

/// Per-side statistics for one match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideMetrics {
    /// Units deployed, by kind name.
    pub units_deployed: BTreeMap<String, u32>,
    /// Units that died.
    pub units_lost: u32,
    /// Towers destroyed.
    pub towers_lost: u32,
    /// Towers standing at the end.
    pub towers_standing: u32,
    /// Units alive at the end.
    pub units_alive: u32,
    /// Damage dealt by this side's units and towers.
    pub damage_dealt: u64,
    /// Damage received.
    pub damage_taken: u64,
    /// Tick of the first hit this side landed.
    pub first_hit_tick: Option<u64>,
    /// Whole resources left at the end.
    pub resources_left: u32,
}

impl SideMetrics {
    /// Total units deployed.
    #[must_use]
    pub fn total_deployed(&self) -> u32 {
        self.units_deployed.values().sum()
    }
}

/// Complete metrics for a single match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    /// Unique match identifier.
    pub game_id: String,
    /// Scenario name.
    pub scenario: String,
    /// Opponent seed.
    pub seed: u64,
    /// Opponent preset name.
    pub difficulty: String,
    /// Match length in ticks.
    pub duration_ticks: u64,
    /// Match length in battle seconds.
    pub duration_secs: f64,
    /// Winning side (None = undecided).
    pub winner: Option<Side>,
    /// How the match ended.
    pub end: EndCondition,
    /// Per-side statistics, keyed by side name.
    pub sides: BTreeMap<String, SideMetrics>,
    /// Scripted placements the battle refused.
    pub placements_rejected: u32,
    /// False when only outcome and end-state fields were filled in, as in
    /// threaded runs where per-tick events are not observed.
    pub detailed: bool,
    /// Final state hash (for determinism validation).
    pub final_state_hash: u64,
}

impl MatchSummary {
    /// Statistics for one side.
    #[must_use]
    pub fn side(&self, side: Side) -> Option<&SideMetrics> {
        self.sides.get(side.name())
    }

    fn side_mut(&mut self, side: Side) -> &mut SideMetrics {
        self.sides.entry(side.name().to_string()).or_default()
    }

    /// One-line human summary.
    #[must_use]
    pub fn headline(&self) -> String {
        match self.winner {
            Some(side) => format!("{side} wins at {:.1}s", self.duration_secs),
            None => format!("undecided after {:.1}s ({:?})", self.duration_secs, self.end),
        }
    }
}

/// Summary statistics across multiple matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Total matches played.
    pub total_games: u32,
    /// Matches won by each side.
    pub wins_by_side: BTreeMap<String, u32>,
    /// Win rates by side.
    pub win_rates: BTreeMap<String, f64>,
    /// Undecided matches.
    pub draws: u32,
    /// Average match length in ticks.
    pub avg_duration_ticks: f64,
    /// Shortest match.
    pub min_duration_ticks: u64,
    /// Longest match.
    pub max_duration_ticks: u64,
    /// Average damage dealt per match, by side.
    pub avg_damage_dealt: BTreeMap<String, f64>,
    /// Average units deployed per match, by side.
    pub avg_units_deployed: BTreeMap<String, f64>,
}

impl BatchSummary {
    /// Calculate summary from a list of match summaries.
    #[must_use]
    pub fn from_games(games: &[MatchSummary]) -> Self {
        if games.is_empty() {
            return Self::default();
        }

        let count = games.len() as f64;
        let mut summary = Self {
            total_games: u32::try_from(games.len()).unwrap_or(u32::MAX),
            min_duration_ticks: u64::MAX,
            ..Default::default()
        };

        let mut duration_sum = 0u64;
        for game in games {
            duration_sum += game.duration_ticks;
            summary.min_duration_ticks = summary.min_duration_ticks.min(game.duration_ticks);
            summary.max_duration_ticks = summary.max_duration_ticks.max(game.duration_ticks);

            match game.winner {
                Some(side) => *summary.wins_by_side.entry(side.name().to_string()).or_default() += 1,
                None => summary.draws += 1,
            }

            for (name, side) in &game.sides {
                *summary.avg_damage_dealt.entry(name.clone()).or_default() += side.damage_dealt as f64;
                *summary.avg_units_deployed.entry(name.clone()).or_default() +=
                    f64::from(side.total_deployed());
            }
        }

        summary.avg_duration_ticks = duration_sum as f64 / count;
        for (side, wins) in &summary.wins_by_side {
            summary
                .win_rates
                .insert(side.clone(), f64::from(*wins) / f64::from(summary.total_games));
        }
        for value in summary
            .avg_damage_dealt
            .values_mut()
            .chain(summary.avg_units_deployed.values_mut())
        {
            *value /= count;
        }

        summary
    }

    /// Win rate for one side; zero when it never won.
    #[must_use]
    pub fn win_rate(&self, side: Side) -> f64 {
        self.win_rates.get(side.name()).copied().unwrap_or(0.0)
    }
}

/// Metrics collector that tracks events during a match.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    summary: MatchSummary,
    /// Owner and kind of every entity seen so far. Attackers may be removed
    /// on the tick they strike, so ownership is remembered.
    known: BTreeMap<EntityId, (Side, Option<UnitKind>)>,
}

impl MetricsCollector {
    /// Create a new metrics collector.
    #[must_use]
    pub fn new(game_id: &str, scenario: &str, seed: u64) -> Self {
        Self {
            summary: MatchSummary {
                game_id: game_id.to_string(),
                scenario: scenario.to_string(),
                seed,
                ..Default::default()
            },
            known: BTreeMap::new(),
        }
    }

    /// Remember the owner of every entity currently in the battle.
    pub fn track(&mut self, battle: &Battle) {
        for entity in battle.entities().iter_sorted() {
            self.known
                .entry(entity.id)
                .or_insert((entity.side, entity.kind()));
        }
    }

    /// A scripted placement was accepted.
    pub fn on_placement(&mut self, side: Side, kind: UnitKind) {
        *self
            .summary
            .side_mut(side)
            .units_deployed
            .entry(kind.name().to_string())
            .or_default() += 1;
    }

    /// A scripted placement was refused.
    pub fn on_rejected(&mut self) {
        self.summary.placements_rejected += 1;
    }

    /// Fold one tick's events in. `battle` is the state after the tick.
    pub fn record(&mut self, battle: &Battle, events: &TickEvents) {
        self.summary.detailed = true;
        let tick = battle.current_tick().saturating_sub(1);

        for &id in &events.spawned {
            if let Some(entity) = battle.entities().get(id) {
                self.known.insert(id, (entity.side, entity.kind()));
                if let Some(kind) = entity.kind() {
                    self.on_placement(entity.side, kind);
                }
            }
        }

        for hit in &events.damage {
            let amount = u64::from(hit.amount);
            if let Some(&(side, _)) = self.known.get(&hit.attacker) {
                let metrics = self.summary.side_mut(side);
                metrics.damage_dealt += amount;
                metrics.first_hit_tick.get_or_insert(tick);
            }
            if let Some(&(side, _)) = self.known.get(&hit.target) {
                self.summary.side_mut(side).damage_taken += amount;
            }
        }

        for id in &events.deaths {
            if let Some(&(side, Some(_))) = self.known.get(id) {
                self.summary.side_mut(side).units_lost += 1;
            }
        }
        for ruin in &events.ruins {
            self.summary.side_mut(ruin.side).towers_lost += 1;
        }
    }

    /// Current metrics (for inspection during the match).
    #[must_use]
    pub fn current(&self) -> &MatchSummary {
        &self.summary
    }

    /// Fill in end-state fields and return the summary.
    #[must_use]
    pub fn finalize(mut self, battle: &Battle, end: EndCondition) -> MatchSummary {
        let tick_rate = battle.config().tick_rate.max(1);
        self.summary.difficulty = battle.config().difficulty.name().to_string();
        self.summary.duration_ticks = battle.current_tick();
        self.summary.duration_secs = battle.current_tick() as f64 / f64::from(tick_rate);
        self.summary.winner = battle.winner();
        self.summary.end = end;
        self.summary.final_state_hash = battle.state_hash();

        for side in Side::BOTH {
            let (towers, units) = battle
                .entities()
                .iter_sorted()
                .filter(|e| e.side == side)
                .fold((0, 0), |(t, u), e| if e.is_structure() { (t + 1, u) } else { (t, u + 1) });
            let resources = battle.readout(side).current;
            let metrics = self.summary.side_mut(side);
            metrics.towers_standing = towers;
            metrics.units_alive = units;
            metrics.resources_left = resources;
        }
        self.summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(winner: Option<Side>, ticks: u64, blue_damage: u64) -> MatchSummary {
        let mut summary = MatchSummary {
            duration_ticks: ticks,
            winner,
            ..Default::default()
        };
        summary.side_mut(Side::Blue).damage_dealt = blue_damage;
        summary
    }

    #[test]
    fn test_batch_summary() {
        let games = vec![
            summary(Some(Side::Red), 100, 10),
            summary(Some(Side::Red), 300, 20),
            summary(Some(Side::Blue), 200, 30),
            summary(None, 400, 40),
        ];
        let batch = BatchSummary::from_games(&games);
        assert_eq!(batch.total_games, 4);
        assert_eq!(batch.draws, 1);
        assert!((batch.win_rate(Side::Red) - 0.5).abs() < 1e-9);
        assert!((batch.win_rate(Side::Blue) - 0.25).abs() < 1e-9);
        assert_eq!(batch.min_duration_ticks, 100);
        assert_eq!(batch.max_duration_ticks, 400);
        assert!((batch.avg_duration_ticks - 250.0).abs() < 1e-9);
        assert!((batch.avg_damage_dealt["Blue"] - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_batch() {
        let batch = BatchSummary::from_games(&[]);
        assert_eq!(batch.total_games, 0);
        assert_eq!(batch.win_rate(Side::Blue), 0.0);
    }

    #[test]
    fn test_collector_attributes_damage() {
        let mut battle = Battle::standard(3).unwrap();
        let mut collector = MetricsCollector::new("g", "s", 3);
        battle.place(UnitKind::Giant, 140, 460, Side::Blue).unwrap();
        collector.on_placement(Side::Blue, UnitKind::Giant);

        for _ in 0..200 {
            collector.track(&battle);
            let events = battle.tick();
            collector.record(&battle, &events);
        }
        let summary = collector.finalize(&battle, EndCondition::Stopped);

        let red = summary.side(Side::Red).unwrap();
        let blue = summary.side(Side::Blue).unwrap();
        assert_eq!(blue.units_deployed["Giant"], 1);
        // Red towers shoot the Giant as it walks in.
        assert!(red.damage_dealt > 0);
        assert_eq!(red.damage_dealt, blue.damage_taken);
        assert!(summary.detailed);
        assert_eq!(summary.duration_ticks, 200);
        assert!((summary.duration_secs - 10.0).abs() < 1e-9);
        assert_eq!(red.towers_standing + red.towers_lost, 3);
    }
}
