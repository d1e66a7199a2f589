#![no_main]

use grinch::audio::{MediaEngine, NullAudioEngine};
use grinch::player::{Command, Player};
use libfuzzer_sys::fuzz_target;
use std::path::Path;

fuzz_target!(|data: &[u8]| {
    let mut engine = NullAudioEngine::new();
    let mut player = Player::new(Path::new("fuzz-music"));
    let len = data.len() % 32;
    for idx in 0..len {
        player.push_track(format!("track_{idx}.mp3"), &mut engine);
    }

    for byte in data {
        let command = match byte % 6 {
            0 => Command::TogglePlayPause,
            1 => Command::Next,
            2 => Command::Previous,
            3 => Command::TrackEnded,
            4 => Command::Select(usize::from(*byte)),
            _ => {
                let _ = player.tick(&mut engine);
                continue;
            }
        };
        let _ = player.dispatch(command, &mut engine);

        match player.current_index() {
            Some(idx) => assert!(idx < player.catalog().len()),
            None => assert!(player.catalog().is_empty()),
        }
        assert_eq!(player.is_playing(), !engine.is_paused() && len > 0);
    }
});
