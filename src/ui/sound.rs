/// Sound effects: short synthesized cues played through rodio.
///
/// Every cue is rendered once into an in-memory WAV buffer when the engine
/// starts; playing one just appends it to a detached Sink.
///
/// Without the "sound" feature (or without an output device) the game runs
/// silently: the stub `SoundEngine` has the same API and does nothing.

use crate::sim::event::GameEvent;

#[cfg(feature = "sound")]
mod inner {
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    const SAMPLE_RATE: u32 = 22050;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        key: Arc<Vec<u8>>,
        portal_open: Arc<Vec<u8>>,
        portal_use: Arc<Vec<u8>>,
        level_start: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = OutputStream::try_default().ok()?;
            Some(SoundEngine {
                _stream: stream,
                handle,
                key: Arc::new(encode_wav(&key_chime())),
                portal_open: Arc::new(encode_wav(&portal_open())),
                portal_use: Arc::new(encode_wav(&portal_whoosh())),
                level_start: Arc::new(encode_wav(&level_start())),
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            let Ok(sink) = Sink::try_new(&self.handle) else { return };
            if let Ok(src) = rodio::Decoder::new(Cursor::new(buf.as_ref().clone())) {
                sink.append(src);
                sink.detach();
            }
        }

        pub fn play_key(&self) { self.play(&self.key); }
        pub fn play_portal_open(&self) { self.play(&self.portal_open); }
        pub fn play_portal_use(&self) { self.play(&self.portal_use); }
        pub fn play_level_start(&self) { self.play(&self.level_start); }
    }

    // ── Synthesis ──

    fn samples_for(seconds: f32) -> usize {
        (SAMPLE_RATE as f32 * seconds) as usize
    }

    /// Sine notes played back to back, each with a decaying envelope.
    fn notes(seq: &[(f32, f32)], volume: f32) -> Vec<f32> {
        let mut out = Vec::new();
        for &(freq, secs) in seq {
            let n = samples_for(secs);
            out.extend((0..n).map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = (1.0 - i as f32 / n as f32).powf(0.7);
                ((t * freq * TAU).sin() * 0.8 + (t * freq * 2.0 * TAU).sin() * 0.2) * env * volume
            }));
        }
        out
    }

    /// Linear frequency sweep with a fade in and out.
    fn sweep(from: f32, to: f32, secs: f32, volume: f32) -> Vec<f32> {
        let n = samples_for(secs);
        let mut phase = 0.0f32;
        (0..n)
            .map(|i| {
                let p = i as f32 / n as f32;
                phase += (from + (to - from) * p) * TAU / SAMPLE_RATE as f32;
                let env = (p * 8.0).min(1.0) * (1.0 - p);
                phase.sin() * env * volume
            })
            .collect()
    }

    /// Bright two-note ping (E6, B6)
    fn key_chime() -> Vec<f32> {
        notes(&[(1319.0, 0.05), (1976.0, 0.12)], 0.25)
    }

    /// Rising arpeggio: the portal unlocks
    fn portal_open() -> Vec<f32> {
        notes(&[(392.0, 0.08), (523.0, 0.08), (659.0, 0.08), (784.0, 0.2)], 0.25)
    }

    fn portal_whoosh() -> Vec<f32> {
        sweep(180.0, 1400.0, 0.6, 0.3)
    }

    fn level_start() -> Vec<f32> {
        notes(&[(523.0, 0.07), (784.0, 0.12)], 0.2)
    }

    /// 16-bit mono PCM WAV.
    fn encode_wav(samples: &[f32]) -> Vec<u8> {
        let data_len = samples.len() as u32 * 2;
        let mut buf = Vec::with_capacity(44 + data_len as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_len).to_le_bytes());
        buf.extend_from_slice(b"WAVEfmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&1u16.to_le_bytes()); // mono
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes());
        buf.extend_from_slice(&2u16.to_le_bytes());
        buf.extend_from_slice(&16u16.to_le_bytes());
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_len.to_le_bytes());

        for &s in samples {
            buf.extend_from_slice(&((s.clamp(-1.0, 1.0) * 32767.0) as i16).to_le_bytes());
        }
        buf
    }
}

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_key(&self) {}
    pub fn play_portal_open(&self) {}
    pub fn play_portal_use(&self) {}
    pub fn play_level_start(&self) {}
}

/// Play the cue for each event. `AllKeysCollected` is covered by
/// `PortalActivated`, which follows it in the same frame.
pub fn play_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let Some(sfx) = sound else { return };
    for ev in events {
        match ev {
            GameEvent::LevelLoaded { .. } => sfx.play_level_start(),
            GameEvent::KeyCollected { .. } => sfx.play_key(),
            GameEvent::PortalActivated => sfx.play_portal_open(),
            GameEvent::PortalUsed => sfx.play_portal_use(),
            GameEvent::AllKeysCollected | GameEvent::TransitionScheduled { .. } => {}
        }
    }
}
