use latticegraph::{CrystalCluster, DistanceSearch, DistanceSearchParameters};
use latticegraph::io::{CifData, LatticeGraphParser};

use log::{Record, Metadata};

/// Implementation of `log::Log` writing all messages to stderr
struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, _: &Metadata) -> bool {
        return true;
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{} -- {}", record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).expect("expected a path to a CIF file or XML library");
    let name = std::env::args().nth(2);

    let _ = log::set_boxed_logger(Box::new(StderrLogger));
    if cfg!(debug_assertions) {
        log::set_max_level(log::LevelFilter::Debug);
    } else {
        log::set_max_level(log::LevelFilter::Info);
    }

    // enable collection of profiling data
    time_graph::enable_data_collection(true);
    // clear any existing collected data
    time_graph::clear_collected_data();

    let mut cluster = time_graph::spanned!("Load unit cell", {
        load_cluster(&path, name.as_deref())?
    });

    time_graph::spanned!("Expand cluster", {
        for n in [2, 4, 8] {
            cluster.reset_size([n, n, n])?;
        }
    });

    println!(
        "{} vertices and {} edges in a {:?} cluster",
        cluster.vertices()?.len(), cluster.edges()?.len(), cluster.size()
    );

    // get the call graph and display it
    let graph = time_graph::get_full_graph();
    // (this requires the "table" feature for the time_graph crate)
    println!("{}", graph.as_short_table());

    // also available for saving profiling data to the disk & future analysis
    // (this requires the "json" feature for the time_graph crate)
    println!("{}", graph.as_json());

    Ok(())
}

/// Load a unit cell from an XML library, or build it from CIF data and search
/// for nearest neighbors edges
fn load_cluster(path: &str, name: Option<&str>) -> Result<CrystalCluster, Box<dyn std::error::Error>> {
    if path.ends_with(".cif") {
        let cif = CifData::from_path(path)?;
        let unit_cell = cif.to_crystal_parameters().build()?;

        let shortest = cif.cell_lengths.iter().copied().fold(f64::INFINITY, f64::min);
        let mut cluster = CrystalCluster::new(unit_cell, [2, 2, 2])?;
        let parameters = DistanceSearchParameters {
            searches: vec![
                DistanceSearch { enabled: true, edge_type: 1, distance: 0.25 * shortest, tolerance: 5.0 },
                DistanceSearch { enabled: true, edge_type: 2, distance: shortest, tolerance: 1.0 },
            ],
        };
        cluster.search_by_parameters(&parameters)?;
        return Ok(cluster);
    }

    let unit_cell = LatticeGraphParser::from_path(path)?.parse_lattice_graph(name)?;
    return Ok(CrystalCluster::new(unit_cell, [2, 2, 2])?);
}
