//! Path and neighborhood queries over the undirected union of the outgoing
//! and incoming maps. All BFS expansion processes each frontier level in
//! sorted slug order, so parent assignment (and therefore the reconstructed
//! path) is deterministic given the same graph state — "lexicographic order
//! of the next hop" per spec.md §4.3.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::graph::GraphState;

/// Breadth-first parent tree rooted at `start`, expanded in deterministic
/// (sorted) order, capped at `max_depth` hops. Returns the parent map and
/// the distance of every node reached.
fn bfs_tree(state: &GraphState, start: &str, max_depth: usize) -> (HashMap<String, String>, HashMap<String, usize>) {
    let mut parent: HashMap<String, String> = HashMap::new();
    let mut distance: HashMap<String, usize> = HashMap::new();
    distance.insert(start.to_string(), 0);

    let mut frontier: Vec<String> = vec![start.to_string()];
    let mut depth = 0;
    while !frontier.is_empty() && depth < max_depth {
        let mut next: BTreeSet<String> = BTreeSet::new();
        for node in &frontier {
            for neighbor in state.undirected_neighbors(node) {
                if !distance.contains_key(&neighbor) {
                    distance.insert(neighbor.clone(), depth + 1);
                    parent.insert(neighbor.clone(), node.clone());
                    next.insert(neighbor);
                }
            }
        }
        frontier = next.into_iter().collect();
        depth += 1;
    }

    (parent, distance)
}

/// Breadth-first expansion over the union graph up to depth `radius`,
/// grouped by distance. Distance 0 (the slug itself) is never included.
pub fn neighbors(state: &GraphState, slug: &str, radius: usize) -> Vec<(usize, Vec<String>)> {
    if radius == 0 || !state.known_slugs.contains(slug) {
        return Vec::new();
    }
    let (_parent, distance) = bfs_tree(state, slug, radius);

    let mut by_distance: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for (node, d) in distance {
        if d == 0 {
            continue;
        }
        by_distance.entry(d).or_default().push(node);
    }
    for group in by_distance.values_mut() {
        group.sort();
    }
    by_distance.into_iter().collect()
}

/// Shortest path from `a` to `b` within `max_depth` hops, or an empty vector
/// if none exists within that bound. `shortest_path(a, a, _) == [a]`.
pub fn shortest_path(state: &GraphState, a: &str, b: &str, max_depth: usize) -> Vec<String> {
    if a == b {
        if state.known_slugs.contains(a) {
            return vec![a.to_string()];
        }
        return Vec::new();
    }
    if !state.known_slugs.contains(a) || !state.known_slugs.contains(b) {
        return Vec::new();
    }

    let (parent, distance) = bfs_tree(state, a, max_depth);
    if !distance.contains_key(b) {
        return Vec::new();
    }

    let mut path = vec![b.to_string()];
    let mut current = b.to_string();
    while current != a {
        let Some(prev) = parent.get(&current) else {
            return Vec::new();
        };
        path.push(prev.clone());
        current = prev.clone();
    }
    path.reverse();
    path
}

/// A "context backbone" assembled from the shortest paths between every
/// pair in `slugs`, plus a one-hop expansion around any slug that sits on
/// two or more of those paths.
pub struct Backbone {
    pub slugs: Vec<String>,
    pub intersections: Vec<String>,
}

/// Compute `shortest_path(a, b)` for every pair `a < b` in `slugs`, union
/// every path's nodes into a backbone, find slugs appearing on >= 2 distinct
/// paths, and expand one radius around each such intersection.
pub fn multi_shortest_paths(state: &GraphState, slugs: &BTreeSet<String>, max_depth: usize) -> Backbone {
    let ordered: Vec<&String> = slugs.iter().collect();
    let mut backbone: BTreeSet<String> = BTreeSet::new();
    let mut membership: HashMap<String, usize> = HashMap::new();

    for i in 0..ordered.len() {
        for j in (i + 1)..ordered.len() {
            let path = shortest_path(state, ordered[i], ordered[j], max_depth);
            for node in &path {
                backbone.insert(node.clone());
                *membership.entry(node.clone()).or_insert(0) += 1;
            }
        }
    }

    let intersections: Vec<String> = membership
        .into_iter()
        .filter(|(_, count)| *count >= 2)
        .map(|(slug, _)| slug)
        .collect();
    let mut intersections = intersections;
    intersections.sort();

    for node in &intersections {
        for (_distance, group) in neighbors(state, node, 1) {
            backbone.extend(group);
        }
    }

    Backbone {
        slugs: backbone.into_iter().collect(),
        intersections,
    }
}

fn tokenize(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// A single scored candidate from `keyword_match`.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchScore {
    pub slug: String,
    pub score: f64,
}

/// Rank notes by (i) tag overlap, (ii) title token overlap, (iii) body token
/// count, truncated to `limit`. Ties break by slug for determinism.
pub fn keyword_match(state: &GraphState, query: &str, limit: usize) -> Vec<MatchScore> {
    const TAG_WEIGHT: f64 = 5.0;
    const TITLE_WEIGHT: f64 = 2.0;
    const BODY_WEIGHT: f64 = 0.01;

    let tokens = tokenize(query);
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut scores: HashMap<String, f64> = HashMap::new();

    for token in &tokens {
        if let Some(members) = state.tags.get(token) {
            for slug in members {
                *scores.entry(slug.clone()).or_insert(0.0) += TAG_WEIGHT;
            }
        }
    }

    for (slug, title) in &state.titles {
        let title_tokens = tokenize(title);
        let overlap = tokens.iter().filter(|t| title_tokens.contains(t)).count();
        if overlap > 0 {
            *scores.entry(slug.clone()).or_insert(0.0) += TITLE_WEIGHT * overlap as f64;
        }
    }

    for slug in &scores.keys().cloned().collect::<Vec<_>>() {
        if let Some(count) = state.body_token_counts.get(slug) {
            *scores.get_mut(slug).unwrap() += BODY_WEIGHT * (*count as f64).min(1000.0);
        }
    }

    let mut ranked: Vec<MatchScore> = scores
        .into_iter()
        .map(|(slug, score)| MatchScore { slug, score })
        .collect();
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap().then_with(|| a.slug.cmp(&b.slug)));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::DensityFormula;
    use arc_core::{FrontMatter, Note};

    fn note(slug: &str, outgoing: &[&str], tags: &[&str], title: &str) -> Note {
        let fm = FrontMatter {
            title: Some(title.to_string()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        };
        let mut n = Note::new(slug, fm, "some body text here");
        n.outgoing = outgoing.iter().map(|s| s.to_string()).collect();
        n
    }

    fn chain_state() -> GraphState {
        let mut state = GraphState::new(DensityFormula::default());
        state.rebuild(&[
            note("a", &["b"], &[], "A"),
            note("b", &["c"], &[], "B"),
            note("c", &["d"], &[], "D"),
            note("d", &[], &[], "D"),
        ]);
        state
    }

    #[test]
    fn shortest_path_direct_edge() {
        let state = chain_state();
        assert_eq!(shortest_path(&state, "a", "b", 10), vec!["a", "b"]);
    }

    #[test]
    fn shortest_path_multi_hop() {
        let state = chain_state();
        assert_eq!(shortest_path(&state, "a", "d", 10), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn shortest_path_respects_max_depth() {
        let state = chain_state();
        assert_eq!(shortest_path(&state, "a", "d", 1), Vec::<String>::new());
    }

    #[test]
    fn shortest_path_same_node_is_singleton() {
        let state = chain_state();
        assert_eq!(shortest_path(&state, "a", "a", 5), vec!["a"]);
    }

    #[test]
    fn shortest_path_is_symmetric_on_a_unique_path() {
        let state = chain_state();
        let forward = shortest_path(&state, "a", "d", 10);
        let mut backward = shortest_path(&state, "d", "a", 10);
        backward.reverse();
        assert_eq!(forward, backward);
    }

    #[test]
    fn shortest_path_unreachable_is_empty() {
        let mut state = GraphState::new(DensityFormula::default());
        state.rebuild(&[note("a", &[], &[], "A"), note("z", &[], &[], "Z")]);
        assert_eq!(shortest_path(&state, "a", "z", 10), Vec::<String>::new());
    }

    #[test]
    fn neighbors_groups_by_distance() {
        let state = chain_state();
        let groups = neighbors(&state, "a", 2);
        assert_eq!(groups, vec![(1, vec!["b".to_string()]), (2, vec!["c".to_string()])]);
    }

    #[test]
    fn multi_shortest_paths_unions_pairwise_paths() {
        let state = chain_state();
        let slugs: BTreeSet<String> = ["a".to_string(), "d".to_string()].into_iter().collect();
        let backbone = multi_shortest_paths(&state, &slugs, 10);
        assert_eq!(backbone.slugs, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn keyword_match_ranks_tag_over_title_over_body() {
        let mut state = GraphState::new(DensityFormula::default());
        state.rebuild(&[
            note("tagged", &[], &["markov"], "Unrelated Title"),
            note("titled", &[], &[], "Markov Chain"),
        ]);
        let results = keyword_match(&state, "markov", 10);
        assert_eq!(results[0].slug, "tagged");
        assert_eq!(results[1].slug, "titled");
    }

    #[test]
    fn keyword_match_truncates_to_limit() {
        let mut state = GraphState::new(DensityFormula::default());
        state.rebuild(&[
            note("a", &[], &["x"], "A"),
            note("b", &[], &["x"], "B"),
            note("c", &[], &["x"], "C"),
        ]);
        let results = keyword_match(&state, "x", 2);
        assert_eq!(results.len(), 2);
    }
}
