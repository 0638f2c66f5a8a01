use argh::FromArgs;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use std::path::PathBuf;

use mindist::align::{AlignConfig, StochasticAligner};
use mindist::k3d::{pointset::PointSet, rotation::RotationVector};

#[derive(FromArgs)]
/// Align a randomly rotated and relabeled copy of a random cluster back onto the cluster
struct Args {
    /// number of points in the cluster
    #[argh(option, short = 'n', default = "12")]
    num_points: usize,

    /// seed of the random cluster and of the alignment
    #[argh(option, short = 's', default = "0")]
    seed: u64,

    /// number of basin hopping steps, overrides the configuration file
    #[argh(option, short = 'i')]
    iterations: Option<usize>,

    /// path to a JSON alignment configuration
    #[argh(option, short = 'c')]
    config_path: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let mut config = match args.config_path {
        Some(path) => serde_json::from_str::<AlignConfig>(&std::fs::read_to_string(path)?)?,
        None => AlignConfig::default(),
    };
    if let Some(iterations) = args.iterations {
        config = config.with_outer_iterations(iterations);
    }
    if config.random_seed.is_none() {
        config = config.with_random_seed(args.seed);
    }

    // random cluster with roughly unit density
    let mut rng = StdRng::seed_from_u64(args.seed);
    let half_width = (args.num_points as f64).cbrt();
    let reference = PointSet::new(
        (0..args.num_points)
            .map(|_| {
                [
                    rng.random_range(-half_width..half_width),
                    rng.random_range(-half_width..half_width),
                    rng.random_range(-half_width..half_width),
                ]
            })
            .collect(),
    );

    // rotate, relabel and move the copy away
    let rotation = RotationVector::random(&mut rng);
    let mut labels = (0..args.num_points).collect::<Vec<_>>();
    labels.shuffle(&mut rng);
    let moving = reference
        .rotated(&rotation.to_matrix())
        .permuted(&labels)
        .translated(&[1.0, -2.0, 3.0]);

    log::info!(
        "aligning {} points, applied rotation angle {:.4} rad",
        args.num_points,
        rotation.angle()
    );

    let mut aligner = StochasticAligner::new(config)?;
    let result = aligner.align(&reference, &moving)?;

    println!("returned distance: {:.8}", result.true_distance);
    println!(
        "distance from coordinates: {:.8}",
        result.aligned_reference.distance(&result.aligned_moving)
    );
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
