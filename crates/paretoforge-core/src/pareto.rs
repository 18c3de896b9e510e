//! Non-dominated sorting, crowding distance and survivor/parent selection
//! over normalized objective vectors (lower is better everywhere).

use crate::core_types::{Candidate, Origin};
use fastrand::Rng;
use paretoforge_protocol::config::ParentSelection;
use std::cmp::Ordering;
use std::collections::HashSet;

/// `a` is no worse than `b` everywhere and strictly better somewhere.
pub fn pareto_dominates(a: &[f64], b: &[f64]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut strictly_better = false;
    for (x, y) in a.iter().zip(b) {
        if x > y {
            return false;
        }
        if x < y {
            strictly_better = true;
        }
    }
    strictly_better
}

/// Feasible candidates dominate infeasible ones; otherwise plain Pareto
/// dominance on the objective vectors.
pub fn dominates(a: &Candidate, b: &Candidate) -> bool {
    match (a.feasible, b.feasible) {
        (true, false) => true,
        (false, true) => false,
        _ => pareto_dominates(&a.objectives, &b.objectives),
    }
}

/// Fronts of candidate indices, front 0 first. Indices inside a front are
/// ascending.
pub fn fast_non_dominated_sort(candidates: &[Candidate]) -> Vec<Vec<usize>> {
    let n = candidates.len();
    let mut domination_count = vec![0usize; n];
    let mut dominated: Vec<Vec<usize>> = vec![Vec::new(); n];

    for i in 0..n {
        for j in (i + 1)..n {
            if dominates(&candidates[i], &candidates[j]) {
                dominated[i].push(j);
                domination_count[j] += 1;
            } else if dominates(&candidates[j], &candidates[i]) {
                dominated[j].push(i);
                domination_count[i] += 1;
            }
        }
    }

    let mut fronts: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = (0..n).filter(|&i| domination_count[i] == 0).collect();
    while !current.is_empty() {
        let mut next = Vec::new();
        for &i in &current {
            for &j in &dominated[i] {
                domination_count[j] -= 1;
                if domination_count[j] == 0 {
                    next.push(j);
                }
            }
        }
        next.sort_unstable();
        fronts.push(current);
        current = next;
    }
    fronts
}

/// Crowding distance of each member of `front`, in `front` order.
pub fn crowding_distance(candidates: &[Candidate], front: &[usize]) -> Vec<f64> {
    let size = front.len();
    if size <= 2 {
        return vec![f64::INFINITY; size];
    }

    let mut distance = vec![0.0f64; size];
    let dims = candidates[front[0]].objectives.len();

    for m in 0..dims {
        let value = |pos: usize| candidates[front[pos]].objectives[m];

        // Positions within `front`, by objective then by candidate index
        let mut order: Vec<usize> = (0..size).collect();
        order.sort_by(|&a, &b| value(a).total_cmp(&value(b)).then(front[a].cmp(&front[b])));

        distance[order[0]] = f64::INFINITY;
        distance[order[size - 1]] = f64::INFINITY;

        let range = value(order[size - 1]) - value(order[0]);
        if range.abs() < 1e-10 {
            continue;
        }
        for k in 1..size - 1 {
            distance[order[k]] += (value(order[k + 1]) - value(order[k - 1])) / range;
        }
    }
    distance
}

/// Rank and crowding distance of every member.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ranking {
    pub fronts: Vec<Vec<usize>>,
    pub rank: Vec<usize>,
    pub crowding: Vec<f64>,
}

pub fn rank(candidates: &[Candidate]) -> Ranking {
    let fronts = fast_non_dominated_sort(candidates);
    let mut rank = vec![0usize; candidates.len()];
    let mut crowding = vec![0.0f64; candidates.len()];

    for (r, front) in fronts.iter().enumerate() {
        for (&idx, d) in front.iter().zip(crowding_distance(candidates, front)) {
            rank[idx] = r;
            crowding[idx] = d;
        }
    }

    Ranking {
        fronts,
        rank,
        crowding,
    }
}

/// Drops candidates whose fingerprint appeared earlier (in `seen` or in
/// `candidates`). Returns the survivors and how many were dropped.
///
/// Rejected proposals are always kept: each one is archived and penalized
/// on its own, even when several share the same (often empty) payload.
pub fn dedup(candidates: Vec<Candidate>, seen: &mut HashSet<String>) -> (Vec<Candidate>, usize) {
    let before = candidates.len();
    let kept: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| c.origin == Origin::Rejected || seen.insert(c.fingerprint()))
        .collect();
    let repeated = before - kept.len();
    (kept, repeated)
}

/// A ranked generation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParetoPopulation {
    members: Vec<Candidate>,
    ranking: Ranking,
}

impl ParetoPopulation {
    pub fn new(members: Vec<Candidate>) -> Self {
        let ranking = rank(&members);
        Self { members, ranking }
    }

    /// `current` followed by `offspring`, duplicates removed (first kept).
    pub fn merge(current: Vec<Candidate>, offspring: Vec<Candidate>) -> (Self, usize) {
        let mut seen = HashSet::new();
        let mut all = current;
        all.extend(offspring);
        let (kept, repeated) = dedup(all, &mut seen);
        (Self::new(kept), repeated)
    }

    pub fn members(&self) -> &[Candidate] {
        &self.members
    }

    pub fn into_members(self) -> Vec<Candidate> {
        self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn fronts(&self) -> &[Vec<usize>] {
        &self.ranking.fronts
    }

    pub fn rank_of(&self, idx: usize) -> usize {
        self.ranking.rank[idx]
    }

    pub fn crowding_of(&self, idx: usize) -> f64 {
        self.ranking.crowding[idx]
    }

    /// Fills `size` slots front by front; the last admitted front is cut by
    /// descending crowding distance (ties by index).
    pub fn select_survivors(&self, size: usize) -> ParetoPopulation {
        let mut chosen: Vec<usize> = Vec::with_capacity(size.min(self.members.len()));

        for front in &self.ranking.fronts {
            let room = size - chosen.len();
            if room == 0 {
                break;
            }
            if front.len() <= room {
                chosen.extend_from_slice(front);
            } else {
                let mut by_crowding = front.clone();
                by_crowding.sort_by(|&a, &b| {
                    self.ranking.crowding[b]
                        .total_cmp(&self.ranking.crowding[a])
                        .then(a.cmp(&b))
                });
                chosen.extend_from_slice(&by_crowding[..room]);
            }
        }

        ParetoPopulation::new(chosen.into_iter().map(|i| self.members[i].clone()).collect())
    }

    /// Crowded comparison: lower rank wins, then larger crowding, then index.
    fn better(&self, a: usize, b: usize) -> Ordering {
        self.ranking.rank[a]
            .cmp(&self.ranking.rank[b])
            .then(self.ranking.crowding[b].total_cmp(&self.ranking.crowding[a]))
            .then(a.cmp(&b))
    }

    /// Picks one member index among `pool` (assumed non-empty).
    pub fn sample_parent(
        &self,
        pool: &[usize],
        selection: ParentSelection,
        tournament_size: usize,
        rng: &mut Rng,
    ) -> usize {
        match selection {
            ParentSelection::Uniform => pool[rng.usize(0..pool.len())],
            ParentSelection::Tournament => {
                let mut best = pool[rng.usize(0..pool.len())];
                for _ in 1..tournament_size.max(1) {
                    let challenger = pool[rng.usize(0..pool.len())];
                    if self.better(challenger, best) == Ordering::Less {
                        best = challenger;
                    }
                }
                best
            }
        }
    }

    /// Feasible members of front 0.
    pub fn pareto_front(&self) -> Vec<&Candidate> {
        self.ranking
            .fronts
            .first()
            .map(|f| {
                f.iter()
                    .map(|&i| &self.members[i])
                    .filter(|c| c.feasible)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(objectives: &[f64], feasible: bool) -> Candidate {
        let mut c = Candidate::proposed(format!("{:?}{}", objectives, feasible), Origin::Seed, 0);
        c.objectives = objectives.to_vec();
        c.feasible = feasible;
        c
    }

    #[test]
    fn test_two_fronts() {
        let pop = vec![
            cand(&[0.1, 0.9], true),
            cand(&[0.9, 0.1], true),
            cand(&[0.5, 0.5], true),
            cand(&[0.6, 0.6], true),
        ];
        let fronts = fast_non_dominated_sort(&pop);
        assert_eq!(fronts, vec![vec![0, 1, 2], vec![3]]);
    }

    #[test]
    fn test_infeasible_never_beats_feasible() {
        let all_worst = cand(&[1.0, 1.0], true);
        let penalized = cand(&[1.0, 1.0], false);
        assert!(dominates(&all_worst, &penalized));
        assert!(!dominates(&penalized, &all_worst));
    }

    #[test]
    fn test_crowding_boundaries_infinite() {
        let pop = vec![
            cand(&[0.0, 1.0], true),
            cand(&[0.4, 0.6], true),
            cand(&[0.5, 0.5], true),
            cand(&[1.0, 0.0], true),
        ];
        let d = crowding_distance(&pop, &[0, 1, 2, 3]);
        assert!(d[0].is_infinite() && d[3].is_infinite());
        assert!((d[1] - 1.0).abs() < 1e-12);
        assert!((d[2] - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_truncation_prefers_crowding() {
        let pop = ParetoPopulation::new(vec![
            cand(&[0.0, 1.0], true),
            cand(&[0.4, 0.6], true),
            cand(&[0.5, 0.5], true),
            cand(&[1.0, 0.0], true),
        ]);
        let survivors = pop.select_survivors(3);
        let kept: Vec<Vec<f64>> = survivors.members().iter().map(|c| c.objectives.clone()).collect();
        assert_eq!(kept, vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.5, 0.5]]);
    }

    #[test]
    fn test_merge_dedups() {
        let a = cand(&[0.1, 0.1], true);
        let (pop, repeated) = ParetoPopulation::merge(vec![a.clone()], vec![a.clone(), a]);
        assert_eq!(pop.len(), 1);
        assert_eq!(repeated, 2);
    }

    #[test]
    fn test_dedup_keeps_every_rejected_proposal() {
        let rejected = || Candidate::proposed("", Origin::Rejected, 1);
        let mut seen = HashSet::new();
        let (kept, repeated) = dedup(vec![rejected(), rejected(), rejected()], &mut seen);
        assert_eq!(kept.len(), 3);
        assert_eq!(repeated, 0);
    }

    #[test]
    fn test_crowded_comparison() {
        let pop = ParetoPopulation::new(vec![cand(&[0.1, 0.1], true), cand(&[0.9, 0.9], true)]);
        assert_eq!(pop.better(0, 1), Ordering::Less);
        assert_eq!(pop.rank_of(1), 1);

        let mut rng = Rng::with_seed(1);
        for _ in 0..20 {
            let picked = pop.sample_parent(&[1], ParentSelection::Tournament, 3, &mut rng);
            assert_eq!(picked, 1);
            let picked = pop.sample_parent(&[0, 1], ParentSelection::Uniform, 0, &mut rng);
            assert!(picked <= 1);
        }
    }
}
