/// Example program to print the loaded configuration
///
/// Run with: cargo run -p rune-config --example print_config

fn main() {
    // Load configuration from rune.toml
    let config = rune_config::RuneConfig::load();

    println!("=== Rune Motion Configuration ===\n");

    println!("Motion Settings:");
    println!("  Enabled: {}", config.motion.enabled);
    println!(
        "  Phases: appear={} enter={} exit={}",
        config.motion.appear, config.motion.enter, config.motion.exit
    );
    println!("  Exit Immediately: {}", config.motion.exit_immediately);
    println!("  Deadline (ms): {}", config.motion.deadline_ms);
    println!("  Frames Per Cue: {}", config.motion.frames_per_cue);
    println!("  Remove On Exit: {}", config.motion.remove_on_exit);
    println!("  Force Render: {}", config.motion.force_render);
    println!("  Exited Class: {:?}", config.motion.exited_class_name);
    println!();

    println!("Demo Settings:");
    println!("  Frame (ms): {}", config.demo.frame_ms);
    println!("  Transition (ms): {}", config.demo.transition_ms);
    println!("  Max Frames: {}", config.demo.max_frames);
    println!("  Steps: {:?}", config.demo.steps);
    println!();

    // Try to serialize to TOML for verification
    match toml::to_string_pretty(&config) {
        Ok(toml_str) => {
            println!("=== Serialized Configuration ===");
            println!("{}", toml_str);
        }
        Err(e) => {
            eprintln!("Failed to serialize config: {}", e);
        }
    }
}
