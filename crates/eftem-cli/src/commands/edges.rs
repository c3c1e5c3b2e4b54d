use anyhow::Result;
use clap::Args;
use console::Style;
use eftem_core::edges::{edges_in, nearest_edge, IONISATION_EDGES};

#[derive(Args)]
pub struct EdgesArgs {
    /// Show the edge closest to this energy loss (eV)
    #[arg(long)]
    pub near: Option<f32>,

    /// Only list edges in LOW..HIGH eV
    #[arg(long, num_args = 2, value_names = ["LOW", "HIGH"])]
    pub range: Option<Vec<f32>>,
}

pub fn run(args: &EdgesArgs) -> Result<()> {
    let energy = Style::new().bold().white();
    let label = Style::new().green();

    if let Some(near) = args.near {
        let (e, name) = nearest_edge(near);
        println!("{:>6} eV  {}", energy.apply_to(e), label.apply_to(name));
        return Ok(());
    }

    let edges: Vec<(u32, &str)> = match args.range.as_deref() {
        Some(&[low, high]) => edges_in(low, high).collect(),
        _ => IONISATION_EDGES.to_vec(),
    };
    for (e, name) in edges {
        println!("{:>6} eV  {}", energy.apply_to(e), label.apply_to(name));
    }
    Ok(())
}
