//! Density-based clustering over cosine distance

use remedy_core::{RemedyError, Result};
use std::collections::VecDeque;

/// `1 - cos(a, b)`; a zero vector has similarity 0 to everything
pub fn cosine_distance(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    1.0 - (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// DBSCAN cluster assignment per point; `None` is noise.
///
/// A point is core when at least `min_samples` points (itself included) lie
/// within `eps`. Cluster ids are assigned in order of the first core point
/// found while scanning the input, so identical input gives identical ids.
/// Border points reachable from several clusters keep the first.
pub fn dbscan(points: &[Vec<f64>], eps: f64, min_samples: usize) -> Result<Vec<Option<usize>>> {
    if eps.is_nan() || eps <= 0.0 {
        return Err(RemedyError::Clustering(format!(
            "eps must be positive, got {}",
            eps
        )));
    }
    if min_samples == 0 {
        return Err(RemedyError::Clustering(
            "min_samples must be at least 1".to_string(),
        ));
    }

    let n = points.len();
    let neighbors = |i: usize| -> Vec<usize> {
        (0..n)
            .filter(|&j| j == i || cosine_distance(&points[i], &points[j]) <= eps)
            .collect()
    };

    let mut labels: Vec<Option<usize>> = vec![None; n];
    let mut visited = vec![false; n];
    let mut next_cluster = 0;

    for i in 0..n {
        if visited[i] {
            continue;
        }
        visited[i] = true;

        let seeds = neighbors(i);
        if seeds.len() < min_samples {
            continue;
        }

        let cluster = next_cluster;
        next_cluster += 1;
        labels[i] = Some(cluster);

        let mut queue: VecDeque<usize> = seeds.into();
        while let Some(j) = queue.pop_front() {
            if labels[j].is_none() {
                labels[j] = Some(cluster);
            }
            if visited[j] {
                continue;
            }
            visited[j] = true;

            let reach = neighbors(j);
            if reach.len() >= min_samples {
                queue.extend(reach);
            }
        }
    }

    Ok(labels)
}
