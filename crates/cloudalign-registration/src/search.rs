use cloudalign_3d::feature::Feature;
use cloudalign_3d::ops::squared_euclidean_distance;
use kiddo::immutable::float::kdtree::ImmutableKdTree;
use kiddo::SquaredEuclidean;

/// A single nearest-neighbor match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Index of the matched point in the indexed set.
    pub index: usize,
    /// Squared Euclidean distance to the query.
    pub distance_sq: f64,
}

/// Nearest-neighbor queries over a fixed set of 3D points.
///
/// Implementations must answer concurrent queries; the drivers share one
/// index across worker threads.
pub trait PointSearch: Sync {
    /// The `k` nearest neighbors of `query`, closest first.
    fn search_knn(&self, query: &[f64; 3], k: usize) -> Vec<Neighbor>;

    /// The nearest neighbors of `query` within `radius`, at most `k` of
    /// them, closest first. Returns an empty vector when none are in range.
    fn search_hybrid(&self, query: &[f64; 3], radius: f64, k: usize) -> Vec<Neighbor> {
        let radius_sq = radius * radius;
        let mut neighbors = self.search_knn(query, k);
        neighbors.retain(|n| n.distance_sq <= radius_sq);
        neighbors
    }
}

/// kd-tree backed point search.
pub struct KdTreeSearch {
    tree: ImmutableKdTree<f64, u32, 3, 32>,
}

impl KdTreeSearch {
    /// Build the index from a point slice.
    pub fn from_points(points: &[[f64; 3]]) -> Self {
        Self {
            tree: ImmutableKdTree::new_from_slice(points),
        }
    }
}

impl PointSearch for KdTreeSearch {
    fn search_knn(&self, query: &[f64; 3], k: usize) -> Vec<Neighbor> {
        self.tree
            .nearest_n::<SquaredEuclidean>(query, k)
            .into_iter()
            .map(|nn| Neighbor {
                index: nn.item as usize,
                distance_sq: nn.distance,
            })
            .collect()
    }
}

/// Exhaustive point search.
///
/// Reference oracle for the kd-tree in tests; usable anywhere a
/// [`PointSearch`] is expected.
pub struct BruteForceSearch {
    points: Vec<[f64; 3]>,
}

impl BruteForceSearch {
    /// Build the index from a point slice.
    pub fn from_points(points: &[[f64; 3]]) -> Self {
        Self {
            points: points.to_vec(),
        }
    }
}

impl PointSearch for BruteForceSearch {
    fn search_knn(&self, query: &[f64; 3], k: usize) -> Vec<Neighbor> {
        let mut neighbors = self
            .points
            .iter()
            .enumerate()
            .map(|(index, p)| Neighbor {
                index,
                distance_sq: squared_euclidean_distance(p, query),
            })
            .collect::<Vec<_>>();
        neighbors.sort_unstable_by(|a, b| a.distance_sq.total_cmp(&b.distance_sq));
        neighbors.truncate(k);
        neighbors
    }
}

/// Nearest-neighbor queries over the columns of a [`Feature`] matrix.
///
/// Descriptor dimensionality is only known at runtime, so this scans
/// linearly rather than going through the const-generic kd-tree.
pub struct FeatureSearch<'a> {
    feature: &'a Feature,
}

impl<'a> FeatureSearch<'a> {
    /// Build the index over a feature matrix.
    pub fn new(feature: &'a Feature) -> Self {
        Self { feature }
    }

    /// The `k` nearest descriptor columns to `query`, closest first.
    ///
    /// `query` must have the feature's dimensionality.
    pub fn search_knn(&self, query: &[f64], k: usize) -> Vec<Neighbor> {
        debug_assert_eq!(query.len(), self.feature.dim());
        let mut neighbors = (0..self.feature.num())
            .map(|index| {
                let col = self.feature.col(index);
                let distance_sq = col
                    .iter()
                    .zip(query.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                Neighbor { index, distance_sq }
            })
            .collect::<Vec<_>>();
        neighbors.sort_unstable_by(|a, b| a.distance_sq.total_cmp(&b.distance_sq));
        neighbors.truncate(k);
        neighbors
    }
}
