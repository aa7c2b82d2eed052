//! Seeded k-means (k-means++ init, Lloyd iterations, best of several runs).

use crate::core::config::ImageSelectorConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const TOLERANCE: f64 = 1e-4;

#[derive(Debug, Clone)]
pub struct KMeans {
    pub k: usize,
    pub n_init: usize,
    pub max_iter: usize,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct Clustering {
    pub labels: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    pub inertia: f64,
}

impl Clustering {
    /// Member indices of every cluster, in cluster order.
    pub fn members(&self) -> Vec<Vec<usize>> {
        let mut members = vec![Vec::new(); self.centroids.len()];
        for (i, &label) in self.labels.iter().enumerate() {
            members[label].push(i);
        }
        members
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl KMeans {
    pub fn new(k: usize, seed: u64) -> Self {
        Self {
            k,
            n_init: 10,
            max_iter: 300,
            seed,
        }
    }

    pub fn from_config(k: usize, config: &ImageSelectorConfig) -> Self {
        Self {
            k,
            n_init: config.kmeans_restarts,
            max_iter: config.kmeans_max_iter,
            seed: config.kmeans_seed,
        }
    }

    /// Clusters `data` into `min(k, data.len())` groups. Same input and seed
    /// always give the same result.
    pub fn fit(&self, data: &[Vec<f64>]) -> Clustering {
        let k = self.k.min(data.len());
        if k == 0 {
            return Clustering {
                labels: vec![0; data.len()],
                centroids: Vec::new(),
                inertia: 0.0,
            };
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<Clustering> = None;
        for _ in 0..self.n_init.max(1) {
            let centroids = Self::init_plus_plus(data, k, &mut rng);
            let run = self.lloyd(data, centroids);
            if best.as_ref().map_or(true, |b| run.inertia < b.inertia) {
                best = Some(run);
            }
        }
        best.unwrap_or_else(|| Clustering {
            labels: vec![0; data.len()],
            centroids: Vec::new(),
            inertia: 0.0,
        })
    }

    fn init_plus_plus(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
        let mut centroids = vec![data[rng.random_range(0..data.len())].clone()];
        let mut closest: Vec<f64> = data
            .iter()
            .map(|p| squared_distance(p, &centroids[0]))
            .collect();

        while centroids.len() < k {
            let total: f64 = closest.iter().sum();
            let next = if total <= 0.0 {
                rng.random_range(0..data.len())
            } else {
                let target = rng.random::<f64>() * total;
                let mut acc = 0.0;
                let mut chosen = data.len() - 1;
                for (i, d) in closest.iter().enumerate() {
                    acc += d;
                    if acc > target {
                        chosen = i;
                        break;
                    }
                }
                chosen
            };
            let centroid = data[next].clone();
            for (c, p) in closest.iter_mut().zip(data) {
                *c = c.min(squared_distance(p, &centroid));
            }
            centroids.push(centroid);
        }
        centroids
    }

    /// Nearest centroid per point. On a distance tie the point keeps its
    /// previous label, so a repaired cluster is not emptied again.
    fn assign(
        data: &[Vec<f64>],
        centroids: &[Vec<f64>],
        previous: Option<&[usize]>,
    ) -> (Vec<usize>, Vec<f64>) {
        data.iter()
            .enumerate()
            .map(|(i, p)| {
                let nearest = centroids
                    .iter()
                    .enumerate()
                    .map(|(j, c)| (j, squared_distance(p, c)))
                    .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best });
                match previous.map(|labels| labels[i]) {
                    Some(prev) if squared_distance(p, &centroids[prev]) <= nearest.1 => {
                        (prev, nearest.1)
                    }
                    _ => nearest,
                }
            })
            .unzip()
    }

    fn lloyd(&self, data: &[Vec<f64>], mut centroids: Vec<Vec<f64>>) -> Clustering {
        let k = centroids.len();
        let dim = data[0].len();
        let (mut labels, mut distances) = Self::assign(data, &centroids, None);

        for _ in 0..self.max_iter {
            let mut sums = vec![vec![0.0; dim]; k];
            let mut counts = vec![0usize; k];
            for (p, &label) in data.iter().zip(&labels) {
                counts[label] += 1;
                for (s, v) in sums[label].iter_mut().zip(p) {
                    *s += v;
                }
            }

            // 空簇：取离自身中心最远的点
            for j in 0..k {
                if counts[j] > 0 {
                    continue;
                }
                let far = distances
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| counts[labels[*i]] > 1)
                    .fold((None, -1.0), |best, (i, d)| if *d > best.1 { (Some(i), *d) } else { best })
                    .0;
                if let Some(i) = far {
                    let old = labels[i];
                    counts[old] -= 1;
                    for (s, v) in sums[old].iter_mut().zip(&data[i]) {
                        *s -= v;
                    }
                    labels[i] = j;
                    distances[i] = 0.0;
                    counts[j] = 1;
                    sums[j] = data[i].clone();
                }
            }

            let mut shift = 0.0;
            for j in 0..k {
                if counts[j] == 0 {
                    continue;
                }
                let updated: Vec<f64> = sums[j].iter().map(|s| s / counts[j] as f64).collect();
                shift += squared_distance(&updated, &centroids[j]);
                centroids[j] = updated;
            }

            let (next_labels, next_distances) = Self::assign(data, &centroids, Some(labels.as_slice()));
            let stable = next_labels == labels;
            labels = next_labels;
            distances = next_distances;
            if stable || shift <= TOLERANCE {
                break;
            }
        }

        Clustering {
            inertia: distances.iter().sum(),
            labels,
            centroids,
        }
    }
}
