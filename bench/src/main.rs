use std::collections::VecDeque;
use std::time::{Duration, Instant};

use hop_count_core::{EngineConfig, FrontierSet, Graph, Procedures};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

const DEPTHS: [i64; 7] = [1, 2, 3, 5, 10, 20, 50];

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(true).init();

    let args: Vec<String> = std::env::args().collect();

    let mode = args.get(1).map(|s| s.as_str()).unwrap_or("all");
    let node_count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(1_000_000);

    if mode == "help" || mode == "--help" {
        println!("Usage: hop-count-bench [mode] [node_count]");
        println!();
        println!("Modes:");
        println!("  all         Run all generators and benchmark each (default)");
        println!("  lsystem     Fractal branching tree (deep paths)");
        println!("  scalefree   Preferential attachment via edge sampling (hub-and-spoke)");
        println!("  smallworld  Watts-Strogatz ring lattice + shortcuts");
        println!("  random      Erdos-Renyi uniform random edges (many components)");
        println!("  barbell     Two dense cliques connected by a thin bridge");
        println!("  dla         Diffusion-limited aggregation (organic branching)");
        println!();
        println!("Default node_count: 1000000");
        println!("Engine settings are read as JSON from HOP_COUNT_CONFIG, e.g. '{{\"workers\": 8}}'");
        return;
    }

    let config = match std::env::var("HOP_COUNT_CONFIG") {
        Ok(json) => match EngineConfig::from_json(&json) {
            Ok(config) => config,
            Err(e) => {
                error!(error = %e, "invalid HOP_COUNT_CONFIG");
                return;
            }
        },
        Err(_) => EngineConfig::default(),
    };

    let generators: Vec<(&str, fn(u64) -> Graph)> = match mode {
        "lsystem" => vec![("L-system tree", gen_lsystem)],
        "scalefree" => vec![("Scale-free (edge sampling)", gen_scale_free)],
        "smallworld" => vec![("Small-world (Watts-Strogatz)", gen_small_world)],
        "random" => vec![("Erdos-Renyi random", gen_random)],
        "barbell" => vec![("Barbell (clique-bridge-clique)", gen_barbell)],
        "dla" => vec![("DLA (organic branching)", gen_dla)],
        "all" => vec![
            ("L-system tree", gen_lsystem as fn(u64) -> Graph),
            ("Scale-free (edge sampling)", gen_scale_free),
            ("Small-world (Watts-Strogatz)", gen_small_world),
            ("Erdos-Renyi random", gen_random),
            ("Barbell (clique-bridge-clique)", gen_barbell),
            ("DLA (organic branching)", gen_dla),
        ],
        _ => {
            eprintln!("Unknown mode: {}. Use --help for options.", mode);
            return;
        }
    };

    println!("hop-count-bench");
    println!("===============");
    println!();

    for (name, generator) in generators {
        if let Err(e) = run_benchmark(name, generator, node_count, config.clone()) {
            error!(generator = name, error = %e, "benchmark aborted");
        }
    }
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn run_benchmark(
    name: &str,
    generator: fn(u64) -> Graph,
    node_count: u64,
    config: EngineConfig,
) -> hop_count_core::Result<()> {
    println!("--- {} ---", name);

    let t = Instant::now();
    let graph = generator(node_count);
    info!(
        generator = name,
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        elapsed_ms = ms(t.elapsed()),
        "graph generated"
    );
    println!(
        "{} nodes, {} edges, ~{:.0}MB",
        graph.node_count(),
        graph.edge_count(),
        graph.memory_usage() as f64 / 1_048_576.0
    );

    let procedures = Procedures::new(&graph, config)?;
    let total = graph.node_count() as u64;
    info!(
        workers = procedures.config().resolved_workers(),
        timeout_ms = ?procedures.config().timeout_ms,
        "engine configured"
    );

    println!();
    println!(
        "{:>6} {:>12} {:>10} {:>12} {:>10}",
        "depth", "khop", "seq", "parallel", "par"
    );
    println!("{:->6} {:->12} {:->10} {:->12} {:->10}", "", "", "", "", "");

    for depth in DEPTHS {
        let t = Instant::now();
        let seq = procedures.khop(0, Some(depth))?.map_or(0, |r| r.value);
        let seq_time = t.elapsed();

        let t = Instant::now();
        let par = procedures.parallel_khop(0, Some(depth))?.map_or(0, |r| r.value);
        let par_time = t.elapsed();

        println!(
            "{:>6} {:>12} {:>8.1}ms {:>12} {:>8.1}ms",
            depth,
            seq,
            ms(seq_time),
            par,
            ms(par_time)
        );
        if seq != par {
            error!(depth, seq, par, "sequential and parallel counts differ");
        }
        // Everything but the start node reached
        if seq + 1 >= total {
            println!("{:>6} (entire graph reached)", "");
            break;
        }
    }

    println!();
    let t = Instant::now();
    let size = procedures.component_size(0)?.map_or(0, |r| r.value);
    println!("component_size(0): {} in {:.1}ms", size, ms(t.elapsed()));

    let t = Instant::now();
    let count = procedures.components_count()?.map_or(0, |r| r.value);
    println!("components_count(): {} in {:.1}ms", count, ms(t.elapsed()));

    // Upper bound for any one call: the seen set holding every node
    let full: FrontierSet = graph.node_ids().iter().copied().collect();
    println!(
        "seen set at full coverage: {} ids, ~{:.1}MB",
        full.cardinality(),
        full.memory_usage() as f64 / 1_048_576.0
    );
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// Generators: deterministic, O(n + edges)
// ---------------------------------------------------------------------------

/// LCG; the same seed always yields the same graph.
struct FastRng(u64);

impl FastRng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next(&mut self, max: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 33) % max
    }
    fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Ternary tree grown level by level from node 0. Frontiers triple per hop.
fn gen_lsystem(node_count: u64) -> Graph {
    let mut graph = Graph::with_capacity(node_count as usize, node_count as usize);
    let branching = 3u64;
    graph.add_node(0);

    let mut next_id: u64 = 1;
    let mut level: Vec<u64> = vec![0];

    while next_id < node_count && !level.is_empty() {
        let mut next_level = Vec::with_capacity(level.len() * branching as usize);
        for &parent in &level {
            for _ in 0..branching {
                if next_id >= node_count {
                    break;
                }
                graph.add_edge(parent, next_id);
                next_level.push(next_id);
                next_id += 1;
            }
        }
        level = next_level;
    }

    graph
}

/// Preferential attachment: each new node links to endpoints sampled from
/// the edge list, so high-degree nodes attract more edges.
fn gen_scale_free(node_count: u64) -> Graph {
    let edges_per_node = 10u64;
    let mut graph = Graph::with_capacity(node_count as usize, (node_count * edges_per_node) as usize);
    let mut rng = FastRng::new(12345);
    let mut endpoints: Vec<u64> = Vec::with_capacity((node_count * edges_per_node * 2) as usize);

    let seed = 5u64.min(node_count);
    for i in 0..seed {
        graph.add_node(i);
        for j in 0..i {
            graph.add_edge(j, i);
            endpoints.extend([i, j]);
        }
    }

    for new_node in seed..node_count {
        graph.add_node(new_node);
        for _ in 0..edges_per_node.min(new_node) {
            let target = endpoints[rng.next(endpoints.len() as u64) as usize];
            if target != new_node {
                graph.add_edge(new_node, target);
                endpoints.extend([new_node, target]);
            }
        }
    }

    graph
}

/// Ring lattice with K forward neighbours per node, each edge rewired to a
/// random target with probability p.
fn gen_small_world(node_count: u64) -> Graph {
    let k = 10u64;
    let p = 0.05f64;
    let mut graph = Graph::with_capacity(node_count as usize, (node_count * k) as usize);
    let mut rng = FastRng::new(67890);

    for i in 0..node_count {
        graph.add_node(i);
    }
    for i in 0..node_count {
        for j in 1..=k {
            let mut target = (i + j) % node_count;
            if rng.next_f64() < p {
                let rewired = rng.next(node_count);
                if rewired != i {
                    target = rewired;
                }
            }
            graph.add_edge(i, target);
        }
    }

    graph
}

/// Erdos-Renyi with ~1 edge per node: below the giant-component threshold
/// for most seeds, so the component scan has real work to do.
fn gen_random(node_count: u64) -> Graph {
    let mut graph = Graph::with_capacity(node_count as usize, node_count as usize);
    let mut rng = FastRng::new(54321);

    for i in 0..node_count {
        graph.add_node(i);
    }
    for _ in 0..node_count {
        let from = rng.next(node_count);
        let to = rng.next(node_count);
        if from != to {
            graph.add_edge(from, to);
        }
    }

    graph
}

/// Two random cliques of n/2 nodes joined by a 10-node chain.
fn gen_barbell(node_count: u64) -> Graph {
    let bridge_len = 10u64;
    let clique_size = node_count.saturating_sub(bridge_len).max(2) / 2;
    let mut graph = Graph::with_capacity(node_count as usize, (clique_size * 40 + bridge_len) as usize);
    let mut rng = FastRng::new(99999);

    let mut clique = |graph: &mut Graph, base: u64| {
        for i in 0..clique_size {
            graph.add_node(base + i);
        }
        for i in 0..clique_size {
            for _ in 0..20u64.min(clique_size - 1) {
                let target = rng.next(clique_size);
                if target != i {
                    graph.add_edge(base + i, base + target);
                }
            }
        }
    };

    clique(&mut graph, 0);
    let bridge_start = clique_size;
    let b_start = bridge_start + bridge_len;
    clique(&mut graph, b_start);

    graph.add_edge(clique_size - 1, bridge_start);
    for id in bridge_start + 1..b_start {
        graph.add_edge(id - 1, id);
    }
    graph.add_edge(b_start - 1, b_start);

    graph
}

/// Diffusion-limited aggregation, simplified: every new node sticks to a
/// recent "surface" node, with an occasional second long-range edge.
fn gen_dla(node_count: u64) -> Graph {
    let mut graph = Graph::with_capacity(node_count as usize, (node_count * 2) as usize);
    let mut rng = FastRng::new(77777);
    let surface_max = 10_000usize;

    graph.add_node(0);
    let mut surface: VecDeque<u64> = VecDeque::with_capacity(surface_max + 1);
    surface.push_back(0);

    for new_node in 1..node_count {
        let attach_to = surface[rng.next(surface.len() as u64) as usize];
        graph.add_edge(new_node, attach_to);

        if rng.next(10) == 0 && new_node > 1 {
            let other = rng.next(new_node);
            if other != attach_to {
                graph.add_edge(new_node, other);
            }
        }

        surface.push_back(new_node);
        if surface.len() > surface_max {
            surface.pop_front();
        }
    }

    graph
}
