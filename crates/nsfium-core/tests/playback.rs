mod common;

use anyhow::Result;
use common::{JAM, Program, ac_rms, image, image_with_chips, player, pulse_tone, render};
use ctor::ctor;
use nsfium_core::{ChannelMask, ChipKind, ChipSet, Error, NsfImage, Player, PlayerConfig, Region};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[ctor]
fn init_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_file(true)
        .with_line_number(true)
        .with_max_level(Level::DEBUG)
        .pretty()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
}

/// Frames skipped before measuring, while the decimator fills its window.
const WARMUP_FRAMES: usize = 2;

fn steady_state(player: &mut Player, frames: usize) -> Vec<f32> {
    render(player, WARMUP_FRAMES);
    render(player, frames)
}

#[test]
fn pulse_tone_is_audible() -> Result<()> {
    let mut player = player(&image(pulse_tone(), Program::new()))?;
    let pcm = steady_state(&mut player, 10);
    assert!(!pcm.is_empty());
    assert!(ac_rms(&pcm) > 0.01, "rms {}", ac_rms(&pcm));
    assert!(pcm.iter().all(|s| s.is_finite()));
    Ok(())
}

#[test]
fn frame_lengths_track_the_play_period() -> Result<()> {
    let mut player = player(&image(pulse_tone(), Program::new()))?;
    let frames = 120;
    let pcm = render(&mut player, frames);
    let expected = frames as f64 * 16_639e-6 * 48_000.0;
    assert!(
        (pcm.len() as f64 - expected).abs() < 100.0,
        "{} samples, expected about {expected}",
        pcm.len()
    );
    Ok(())
}

#[test]
fn muted_channel_is_silent() -> Result<()> {
    let config = PlayerConfig {
        channel_mask: ChannelMask::all() - ChannelMask::PULSE1,
        ..PlayerConfig::default()
    };
    let mut player = Player::new(&image(pulse_tone(), Program::new()), &config)?;
    let pcm = steady_state(&mut player, 5);
    assert!(pcm.iter().all(|s| s.abs() < 1e-6));

    player.set_channel_mask(ChannelMask::all());
    let pcm = steady_state(&mut player, 5);
    assert!(ac_rms(&pcm) > 0.01);
    Ok(())
}

#[test]
fn bank_select_maps_code_in() -> Result<()> {
    // Bank 0: init maps bank 1 at $9000 and calls into it.
    let init = Program::new().store(0x5FF9, 0x01).jsr(0x9000).rts();
    let tone = pulse_tone().rts();
    let mut data = init.into_bytes();
    data.resize(0x1000, 0);
    data.extend(tone.into_bytes());

    let mut image = NsfImage::new(0x8000, 0x8000, 0x8000 + 8, data);
    // Slot 7 is never executed; the nonzero entry makes the image banked.
    image.bank_init = [0, 0, 0, 0, 0, 0, 0, 1];
    let mut player = player(&image)?;
    let pcm = steady_state(&mut player, 5);
    assert!(ac_rms(&pcm) > 0.01);
    Ok(())
}

#[test]
fn vrc6_pulse_is_audible() -> Result<()> {
    let init = Program::new()
        .store(0x9000, 0x7F)
        .store(0x9001, 0xFF)
        .store(0x9002, 0x80);
    let mut player = player(&image_with_chips(init, ChipSet::VRC6))?;
    assert_eq!(player.chips().collect::<Vec<_>>(), vec![ChipKind::Vrc6]);
    assert_eq!(player.channel_count(), 8);
    let pcm = steady_state(&mut player, 5);
    assert!(ac_rms(&pcm) > 0.01);
    Ok(())
}

#[test]
fn vrc6_saw_is_audible() -> Result<()> {
    let init = Program::new()
        .store(0xB000, 42)
        .store(0xB001, 0xFF)
        .store(0xB002, 0x80);
    let mut player = player(&image_with_chips(init, ChipSet::VRC6))?;
    let pcm = steady_state(&mut player, 5);
    assert!(ac_rms(&pcm) > 0.01, "rms {}", ac_rms(&pcm));
    assert!(pcm.iter().all(|s| s.is_finite()));
    Ok(())
}

#[test]
fn dmc_sample_plays_at_its_rate() -> Result<()> {
    // Fastest NTSC rate, 4081 bytes from $C000: 4081 * 8 * 54 cycles, a
    // little over 59 frames.
    let init = Program::new()
        .store(0x4010, 0x0F)
        .store(0x4012, 0x00)
        .store(0x4013, 0xFF)
        .store(0x4015, 0x10);
    // `LDA $4015`
    let play = Program::new().byte(0xAD).byte(0x15).byte(0x40).rts();
    let mut player = player(&image(init, play))?;

    render(&mut player, 55);
    assert_ne!(player.cpu().registers().a & 0x10, 0, "sample ended early");
    render(&mut player, 10);
    assert_eq!(player.cpu().registers().a & 0x10, 0, "sample still playing");
    Ok(())
}

#[test]
fn vrc7_voice_is_audible() -> Result<()> {
    let init = Program::new()
        .vrc7(0x30, 0x10)
        .vrc7(0x10, 0xAC)
        .vrc7(0x20, 0x10 | (4 << 1));
    let mut player = player(&image_with_chips(init, ChipSet::VRC7))?;
    assert_eq!(player.channel_count(), 11);
    let pcm = steady_state(&mut player, 10);
    assert!(ac_rms(&pcm) > 0.001, "rms {}", ac_rms(&pcm));
    Ok(())
}

#[test]
fn n163_wave_is_audible() -> Result<()> {
    let mut init = Program::new().store(0xF800, 0x80);
    for byte in [0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF] {
        init = init.store(0x4800, byte);
    }
    init = init.store(0xF800, 0x80 | 0x78);
    for byte in [0x00, 0x00, 0x20, 0x00, 0xF0, 0x00, 0x00, 0x0F] {
        init = init.store(0x4800, byte);
    }
    let mut player = player(&image_with_chips(init, ChipSet::N163))?;
    let pcm = steady_state(&mut player, 5);
    assert!(ac_rms(&pcm) > 0.05, "rms {}", ac_rms(&pcm));
    Ok(())
}

#[test]
fn unsupported_chips_are_skipped() -> Result<()> {
    let image = image_with_chips(pulse_tone(), ChipSet::FDS | ChipSet::VRC6);
    let player = player(&image)?;
    assert_eq!(player.chips().collect::<Vec<_>>(), vec![ChipKind::Vrc6]);
    Ok(())
}

#[test]
fn jammed_play_routine_idles_out_the_frame() -> Result<()> {
    let mut player = player(&image(pulse_tone(), Program::new().byte(JAM)))?;
    let pcm = steady_state(&mut player, 5);
    assert!(player.cpu().is_jammed());
    // The tone set up by init keeps playing while the CPU is stuck.
    assert!(ac_rms(&pcm) > 0.01);
    Ok(())
}

#[test]
fn init_receives_song_and_region() -> Result<()> {
    let mut image = image(Program::new(), Program::new());
    image.song_count = 3;
    image.starting_song = 1;
    let config = PlayerConfig {
        region: Some(Region::Pal),
        ..PlayerConfig::default()
    };
    let mut player = Player::new(&image, &config)?;
    assert_eq!(player.region(), Region::Pal);
    assert_eq!(player.song(), 1);
    let regs = player.cpu().registers();
    assert_eq!((regs.a, regs.x), (1, 1));

    player.start_song(2)?;
    assert_eq!(player.cpu().registers().a, 2);
    assert!(matches!(
        player.start_song(3),
        Err(Error::SongOutOfRange { song: 3, count: 3 })
    ));
    Ok(())
}

#[test]
fn invalid_setups_are_rejected() {
    let image = image(pulse_tone(), Program::new());
    let config = PlayerConfig {
        sample_rate: 0,
        ..PlayerConfig::default()
    };
    assert!(matches!(
        Player::new(&image, &config),
        Err(Error::InvalidSampleRate(0))
    ));

    let low = NsfImage::new(0x7000, 0x7000, 0x7000, vec![0x60]);
    assert!(matches!(
        Player::new(&low, &PlayerConfig::default()),
        Err(Error::InvalidLoadAddress(0x7000))
    ));
}

#[test]
fn bad_lowpass_is_ignored() -> Result<()> {
    let config = PlayerConfig {
        lowpass: Some("not-a-filter".into()),
        ..PlayerConfig::default()
    };
    let mut player = Player::new(&image(pulse_tone(), Program::new()), &config)?;
    let pcm = steady_state(&mut player, 5);
    assert!(ac_rms(&pcm) > 0.01);
    Ok(())
}

#[test]
fn volume_scales_output() -> Result<()> {
    let mut loud = player(&image(pulse_tone(), Program::new()))?;
    let mut quiet = loud.clone();
    quiet.set_volume(0.5);
    let a = steady_state(&mut loud, 5);
    let b = steady_state(&mut quiet, 5);
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(&b) {
        assert!((x * 0.5 - y).abs() < 1e-6);
    }
    Ok(())
}
