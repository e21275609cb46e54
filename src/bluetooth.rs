use crate::config::BluetoothConfig;
use crate::process::{query_lossy, run_detached, Clock, CommandRunner, CommandSpec};

const CARD_MARKER: &str = "bluez_card";

pub fn connect_script(address: &str) -> String {
    let mut script = [
        format!("disconnect {address}"),
        "power on".to_string(),
        "agent on".to_string(),
        "default-agent".to_string(),
        format!("trust {address}"),
        format!("connect {address}"),
        "quit".to_string(),
    ]
    .join("\n");
    script.push('\n');
    script
}

pub fn connect_command(address: &str) -> CommandSpec {
    CommandSpec::new("bluetoothctl", Vec::<String>::new()).with_stdin(connect_script(address))
}

pub fn connect(
    runner: &dyn CommandRunner,
    clock: &dyn Clock,
    address: &str,
    config: &BluetoothConfig,
) {
    println!("Connecting bluetooth device {address}...");
    run_detached(runner, &connect_command(address));
    clock.sleep(config.connect_settle());
}

pub fn bluetooth_cards(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter(|line| line.contains(CARD_MARKER))
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(ToOwned::to_owned)
        .collect()
}

pub fn activate_profile(
    runner: &dyn CommandRunner,
    clock: &dyn Clock,
    config: &BluetoothConfig,
) -> Vec<String> {
    let listing = query_lossy(
        runner,
        &CommandSpec::new("pactl", ["list", "cards", "short"]),
    );
    let cards = bluetooth_cards(&listing);
    if cards.is_empty() {
        tracing::debug!("no bluetooth cards listed");
    }

    for card in &cards {
        println!("Activating {} on {card}", config.profile);
        run_detached(
            runner,
            &CommandSpec::new(
                "pactl",
                ["set-card-profile", card.as_str(), config.profile.as_str()],
            ),
        );
        clock.sleep(config.profile_settle());
    }
    cards
}
