use std::path::Path;
use std::time::Duration;

use console::Style;
use eftem_core::dataset::FitInput;
use eftem_core::edges::nearest_edge;
use eftem_core::pipeline::config::MapConfig;
use eftem_core::report::{ImageStatistics, RunReport, Statistics};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    warning: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            warning: Style::new().yellow().bold(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_map_summary(input: &FitInput, config: &MapConfig, workers: usize, output: &Path) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Elemental Map"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(13)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Size"),
        s.value.apply_to(format!("{} x {}", input.width(), input.height()))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(output.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Workers"),
        s.value.apply_to(workers)
    );
    println!();

    let (edge, element) = nearest_edge(input.edge_threshold());
    let source = if config.edge_energy_loss.is_some() {
        "given"
    } else {
        "predicted"
    };
    println!("  {}", s.header.apply_to("Edge"));
    println!(
        "    {:<12}{} eV ({})",
        s.label.apply_to("Threshold"),
        s.value.apply_to(input.edge_threshold()),
        s.method.apply_to(source)
    );
    println!(
        "    {:<12}{} eV {}",
        s.label.apply_to("Nearest"),
        s.value.apply_to(edge),
        s.method.apply_to(element)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Epsilon"),
        s.value.apply_to(input.epsilon())
    );
    println!();

    println!("  {}", s.header.apply_to("Images"));
    for (i, img) in input.images().iter().enumerate() {
        let side = if i < input.edge_index() {
            s.label.apply_to("pre-edge ")
        } else {
            s.method.apply_to("post-edge")
        };
        println!(
            "    {}  {:>8} eV  {}",
            side,
            s.value.apply_to(img.energy_loss),
            img.label
        );
    }
    println!();
}

pub fn print_run_summary(report: &RunReport, elapsed: Duration) {
    let s = Styles::new();

    println!();
    println!("  {}", s.header.apply_to("Fit"));
    for count in report.errors.counts.iter().filter(|c| c.pixels > 0) {
        let style = if count.code == 0 { &s.value } else { &s.warning };
        println!(
            "    {:<24}{} ({:.1}%)",
            s.label.apply_to(&count.description),
            style.apply_to(count.pixels),
            count.fraction * 100.0
        );
    }
    print_stats(&s, "r", &report.r);
    print_stats(&s, "a", &report.a);
    println!();

    println!("  {}", s.header.apply_to("Map"));
    print_images(&s, &report.map);
    println!("  {}", s.header.apply_to("SNR"));
    print_images(&s, &report.snr);
    println!();

    match (&report.coeff_of_det, &report.chi2) {
        (Some(cod), Some(chi2)) => {
            println!("  {}", s.header.apply_to("Goodness of fit"));
            print_stats(&s, "R\u{b2}", cod);
            print_stats(&s, "\u{3c7}\u{b2}", chi2);
        }
        _ => println!(
            "  {:<16}{}",
            s.header.apply_to("Goodness of fit"),
            s.disabled.apply_to("skipped")
        ),
    }
    println!();

    println!("  {}", s.header.apply_to("Timings"));
    for t in &report.timings {
        if t.skipped {
            println!(
                "    {:<30}{}",
                s.label.apply_to(t.stage),
                s.disabled.apply_to("skipped")
            );
        } else {
            println!(
                "    {:<30}{}",
                s.label.apply_to(t.stage),
                s.value.apply_to(format!("{:.1} ms", t.elapsed.as_secs_f64() * 1000.0))
            );
        }
    }
    println!(
        "    {:<30}{}",
        s.label.apply_to("Total"),
        s.value.apply_to(format!("{:.1} ms", elapsed.as_secs_f64() * 1000.0))
    );
}

fn print_images(s: &Styles, images: &[ImageStatistics]) {
    for img in images {
        print_stats(s, &img.label, &img.stats);
    }
}

fn print_stats(s: &Styles, name: &str, stats: &Statistics) {
    println!(
        "    {:<24}{}",
        s.label.apply_to(name),
        s.value.apply_to(format!(
            "mean {:.4}  median {:.4}  stdv {:.4}",
            stats.mean, stats.median, stats.stdv
        ))
    );
}
