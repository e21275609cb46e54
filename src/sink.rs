use crate::config::SinkConfig;
use crate::process::{query_lossy, run_detached, Clock, CommandRunner, CommandSpec};

const SINK_MARKER: &str = "bluez";

pub fn list_sinks_command() -> CommandSpec {
    CommandSpec::new("pactl", ["list", "short", "sinks"])
}

pub fn find_bluetooth_sink(listing: &str) -> Option<String> {
    let mut marked = listing.lines().filter(|line| line.contains(SINK_MARKER));
    let first = marked.next()?.split_whitespace().nth(1)?;
    let others: Vec<&str> = marked
        .filter_map(|line| line.split_whitespace().nth(1))
        .collect();
    if !others.is_empty() {
        tracing::warn!(
            chosen = first,
            ignored = ?others,
            "several bluetooth sinks listed; using the first one"
        );
    }
    Some(first.to_string())
}

/// Gives up after `poll_attempts` queries, without sleeping after the last one.
pub fn locate(
    runner: &dyn CommandRunner,
    clock: &dyn Clock,
    config: &SinkConfig,
) -> Option<String> {
    println!("Waiting for bluetooth sink...");
    let command = list_sinks_command();

    for attempt in 1..=config.poll_attempts {
        let listing = query_lossy(runner, &command);
        if let Some(sink) = find_bluetooth_sink(&listing) {
            tracing::debug!(attempt, sink = %sink, "bluetooth sink found");
            return Some(sink);
        }
        if attempt < config.poll_attempts {
            clock.sleep(config.poll_interval());
        }
    }

    tracing::debug!(attempts = config.poll_attempts, "bluetooth sink not found");
    None
}

pub fn configure_commands(sink: &str, config: &SinkConfig) -> Vec<CommandSpec> {
    vec![
        CommandSpec::new("pactl", ["set-default-sink", sink]),
        CommandSpec::new("pactl", ["set-sink-volume", sink, config.volume.as_str()]),
        CommandSpec::new("pactl", ["set-sink-mute", sink, "0"]),
    ]
}

pub fn configure(runner: &dyn CommandRunner, sink: &str, config: &SinkConfig) {
    println!("Using sink: {sink}");
    for command in configure_commands(sink, config) {
        run_detached(runner, &command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn contents(&self) -> String {
            let bytes = self.0.lock().map(|buf| buf.clone()).unwrap_or_default();
            String::from_utf8_lossy(&bytes).to_string()
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if let Ok(mut inner) = self.0.lock() {
                inner.extend_from_slice(buf);
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    const LISTING: &str = "\
0\talsa_output.pci-0000_00_1f.3.analog-stereo\tmodule-alsa-card.c\ts16le 2ch 44100Hz\tSUSPENDED
1\tbluez_sink.41_42_C1_2C_4F_68.a2dp_sink\tmodule-bluez5-device.c\ts16le 2ch 44100Hz\tIDLE
2\tbluez_sink.00_11_22_33_44_55.a2dp_sink\tmodule-bluez5-device.c\ts16le 2ch 44100Hz\tIDLE";

    #[test]
    fn first_bluetooth_line_wins() {
        assert_eq!(
            find_bluetooth_sink(LISTING).as_deref(),
            Some("bluez_sink.41_42_C1_2C_4F_68.a2dp_sink")
        );
    }

    #[test]
    fn several_sinks_are_reported_in_a_warning() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .finish();

        let sink = tracing::subscriber::with_default(subscriber, || find_bluetooth_sink(LISTING));

        assert_eq!(sink.as_deref(), Some("bluez_sink.41_42_C1_2C_4F_68.a2dp_sink"));
        let logged = captured.contents();
        assert!(logged.contains("WARN"));
        assert!(logged.contains("several bluetooth sinks listed"));
        assert!(logged.contains("bluez_sink.00_11_22_33_44_55.a2dp_sink"));
    }

    #[test]
    fn single_sink_logs_nothing() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .finish();
        let listing = "1\tbluez_sink.41_42_C1_2C_4F_68.a2dp_sink\tmodule-bluez5-device.c";

        let sink = tracing::subscriber::with_default(subscriber, || find_bluetooth_sink(listing));

        assert!(sink.is_some());
        assert!(captured.contents().is_empty());
    }

    #[test]
    fn first_marked_line_decides_even_when_malformed() {
        let listing = "bluez\n1\tbluez_sink.41_42_C1_2C_4F_68.a2dp_sink\tmodule-bluez5-device.c";
        assert_eq!(find_bluetooth_sink(listing), None);
    }

    #[test]
    fn listing_without_bluetooth_has_no_sink() {
        assert_eq!(
            find_bluetooth_sink("0\talsa_output.pci.analog-stereo\tmodule-alsa-card.c"),
            None
        );
        assert_eq!(find_bluetooth_sink(""), None);
    }

    #[test]
    fn configure_commands_depend_only_on_input() {
        let config = SinkConfig::default();
        let first = configure_commands("bluez_sink.x", &config);
        let second = configure_commands("bluez_sink.x", &config);
        assert_eq!(first, second);

        let rendered: Vec<String> = first.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "pactl set-default-sink bluez_sink.x",
                "pactl set-sink-volume bluez_sink.x 100%",
                "pactl set-sink-mute bluez_sink.x 0",
            ]
        );
    }
}
