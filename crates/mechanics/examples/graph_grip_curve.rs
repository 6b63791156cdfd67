use mechanics::grip::compute_grip;
use mechanics::surface::{RoadSurface, RoadType};
use mechanics::tire::{compute_force, TireParams};
use plotters::prelude::*;

fn draw_curves(
    filename: &str,
    title: &str,
    x_label: &str,
    y_label: &str,
    x: &[f64],
    curves: &[(String, Vec<f64>)],
) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(filename, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let x_min = x.iter().cloned().fold(f64::INFINITY, f64::min);
    let x_max = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let y_min = curves
        .iter()
        .flat_map(|(_, y)| y.iter().cloned())
        .fold(f64::INFINITY, f64::min);
    let y_max = curves
        .iter()
        .flat_map(|(_, y)| y.iter().cloned())
        .fold(f64::NEG_INFINITY, f64::max);

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("Arial", 28))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart.configure_mesh().x_desc(x_label).y_desc(y_label).draw()?;

    for (i, (label, y)) in curves.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        chart
            .draw_series(LineSeries::new(x.iter().cloned().zip(y.iter().cloned()), color))?
            .label(label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.filled()));
    }

    chart.configure_series_labels().border_style(&BLACK).draw()?;

    root.present()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let params = TireParams::default();
    let load = 3000.0; // [N]
    let roads = [RoadType::Asphalt, RoadType::Gravel, RoadType::Grass, RoadType::Ice];

    // 1) Grip coefficient vs slip ratio on each road type
    let kappas: Vec<f64> = (0..=300).map(|i| -1.0 + 2.0 * i as f64 / 300.0).collect();
    let grip_curves: Vec<(String, Vec<f64>)> = roads
        .iter()
        .map(|&road| {
            let surface = RoadSurface::new(road, 1.0).sample();
            let grip = kappas
                .iter()
                .map(|&kappa| compute_grip(load, kappa, 0.0, &surface, &params))
                .collect();
            (format!("{road:?}"), grip)
        })
        .collect();

    draw_curves(
        "grip_vs_slip_ratio.png",
        "Grip vs Slip Ratio",
        "Slip Ratio [-]",
        "Grip [-]",
        &kappas,
        &grip_curves,
    )?;

    // 2) Lateral force vs slip angle on dry asphalt for several loads
    let surface = RoadSurface::new(RoadType::Asphalt, 1.0).sample();
    let alphas_deg: Vec<f64> = (-30..=30).map(|d| d as f64).collect();
    let force_curves: Vec<(String, Vec<f64>)> = [1500.0, 3000.0, 6000.0]
        .iter()
        .map(|&load| {
            let fy = alphas_deg
                .iter()
                .map(|deg| {
                    let alpha = deg.to_radians();
                    let grip = compute_grip(load, 0.0, alpha, &surface, &params);
                    compute_force(grip, load, 0.0, alpha, &params).lateral
                })
                .collect();
            (format!("{load} N"), fy)
        })
        .collect();

    draw_curves(
        "lateral_vs_slip_angle.png",
        "Lateral Force vs Slip Angle",
        "Slip Angle [deg]",
        "Lateral Force Fy [N]",
        &alphas_deg,
        &force_curves,
    )?;

    println!("Wrote plots: grip_vs_slip_ratio.png, lateral_vs_slip_angle.png");

    Ok(())
}
