use ambiverb::reverb::FitReport;
use ambiverb::FdnReverb;

fn format_t60(t60: f32) -> String {
    if t60 < 0.0 {
        "   n/a".to_string()
    } else {
        format!("{:6.3}", t60)
    }
}

pub fn print_measurement(reverb: &FdnReverb, bands: &[f32], t60: &[f32], broadband: f32) {
    let params = reverb.params();
    println!(
        "room {} x {} x {} m, absorption {:.3}, damping {:.3}, target T60 {:.3} s",
        params.room.x,
        params.room.y,
        params.room.z,
        params.absorption,
        params.damping,
        params.effective_t60()
    );
    println!("{:>8}  {:>6}", "band Hz", "T60 s");
    for (fc, t) in bands.iter().zip(t60) {
        println!("{:>8.0}  {}", fc, format_t60(*t));
    }
    println!("{:>8}  {}", "broad", format_t60(broadband));
}

pub fn print_fit(vcf: &[f32], vt60: &[f32], before: &[f32], fit: &FitReport) {
    println!("{:>8}  {:>6}  {:>6}  {:>6}", "band Hz", "target", "before", "after");
    for i in 0..vcf.len() {
        println!(
            "{:>8.0}  {}  {}  {}",
            vcf[i],
            format_t60(vt60[i]),
            format_t60(before[i]),
            format_t60(fit.measured[i])
        );
    }
    println!();
    println!("absorption = {:.4}", fit.absorption);
    println!("damping    = {:.4}", fit.damping);
    match fit.damping_error {
        Some(err) => println!(
            "residual   = {:.2e} (longest band), {:.2e} (slope)",
            fit.absorption_error, err
        ),
        None => println!("residual   = {:.2e} (longest band)", fit.absorption_error),
    }
    println!("rounds     = {} (last search: {:?})", fit.rounds, fit.status);
}
