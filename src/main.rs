use std::io::BufRead;
use std::thread;
use std::time::Duration;

use log::{error, info};
use tokio::sync::broadcast;

use tubelist::config;
use tubelist::player::SimulatedPlayer;
use tubelist::player_controller::PlayerController;
use tubelist::player_events::PlayerEventMachine;
use tubelist::playlist_manager::PlaylistManager;
use tubelist::protocol::{Message, PlaybackMessage, PlayerCommand, PlaylistMessage};
use tubelist::render::ConsoleRenderer;
use tubelist::store::StoreManager;
use tubelist::title_resolver::TitleResolver;
use tubelist::video_id::VideoId;

fn panic_payload_to_string(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "non-string panic payload".to_string()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Info);
    clog.init();

    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{}': {}", thread_name, panic_info);
    }));

    let config = config::load_or_create();

    // Bus for communication between components
    let (bus_sender, _) = broadcast::channel(1024);

    // Setup playlist manager
    let manager_bus_receiver = bus_sender.subscribe();
    let manager_bus_sender = bus_sender.clone();
    let store = StoreManager::new(config.store.path.clone())?;
    thread::spawn(move || {
        let mut playlist_manager =
            PlaylistManager::new(manager_bus_receiver, manager_bus_sender, store);
        playlist_manager.run();
    });

    // Setup title resolver
    let resolver_bus_receiver = bus_sender.subscribe();
    let resolver_bus_sender = bus_sender.clone();
    let lookup_config = config.lookup.clone();
    thread::spawn(move || {
        let mut title_resolver =
            TitleResolver::new(resolver_bus_receiver, resolver_bus_sender, &lookup_config);
        title_resolver.run();
    });

    // Setup player controller with the simulated external player
    let controller_bus_receiver = bus_sender.subscribe();
    let controller_bus_sender = bus_sender.clone();
    let player = SimulatedPlayer::new(bus_sender.clone());
    thread::spawn(move || {
        let mut player_controller = PlayerController::new(
            controller_bus_receiver,
            controller_bus_sender,
            Box::new(player),
        );
        player_controller.run();
    });

    // Setup player event machine
    let events_bus_receiver = bus_sender.subscribe();
    let events_bus_sender = bus_sender.clone();
    let poll_interval = Duration::from_millis(config.playback.progress_poll_interval_ms);
    thread::spawn(move || {
        let run_result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut event_machine =
                PlayerEventMachine::new(events_bus_receiver, events_bus_sender, poll_interval);
            event_machine.run();
        }));
        if let Err(payload) = run_result {
            error!(
                "PlayerEventMachine thread terminated due to panic: {}",
                panic_payload_to_string(payload.as_ref())
            );
        }
    });

    // Setup renderer
    let renderer_bus_receiver = bus_sender.subscribe();
    let renderer_bus_sender = bus_sender.clone();
    thread::spawn(move || {
        let mut renderer = ConsoleRenderer::new(renderer_bus_receiver, renderer_bus_sender);
        renderer.run();
    });

    info!("tubelist ready. Type 'help' for commands.");
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            continue;
        };
        let argument = parts.next();

        let message = match (command, argument) {
            ("add", Some(link)) => Some(Message::Playlist(PlaylistMessage::AddTrack(
                link.to_string(),
            ))),
            ("rm", Some(index)) => index
                .parse()
                .ok()
                .map(|i| Message::Playlist(PlaylistMessage::RemoveTrack(i))),
            ("play", Some(index)) => index
                .parse()
                .ok()
                .map(|i| Message::Playback(PlaybackMessage::PlayIndex(i))),
            ("next", _) => Some(Message::Playback(PlaybackMessage::Next)),
            ("prev", _) => Some(Message::Playback(PlaybackMessage::Previous)),
            ("pause", _) => Some(Message::Player(PlayerCommand::TogglePlayPause)),
            ("seek", Some(fraction)) => fraction
                .parse()
                .ok()
                .map(|f| Message::Player(PlayerCommand::SeekFraction(f))),
            ("fav", Some(id)) => Some(Message::Playlist(PlaylistMessage::ToggleFavorite(
                VideoId::new(id),
            ))),
            ("shuffle", _) => Some(Message::Playlist(PlaylistMessage::ToggleShuffle)),
            ("repeat", _) => Some(Message::Playlist(PlaylistMessage::ToggleRepeat)),
            ("clear", _) => Some(Message::Playlist(PlaylistMessage::Clear)),
            ("history", _) => Some(Message::Playlist(PlaylistMessage::ShowHistory)),
            ("favs", _) => Some(Message::Playlist(PlaylistMessage::ShowFavorites)),
            ("help", _) => {
                println!(
                    "commands: add <link> | rm <index> | play <index> | next | prev | pause \
                     | seek <0..1> | fav <id> | shuffle | repeat | clear | history | favs | quit"
                );
                None
            }
            ("quit", _) | ("exit", _) => break,
            _ => {
                println!("unknown command, type 'help'");
                None
            }
        };

        if let Some(message) = message {
            let _ = bus_sender.send(message);
        }
    }

    info!("Application exiting");
    Ok(())
}
