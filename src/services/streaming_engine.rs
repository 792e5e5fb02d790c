//! Streaming Engine (§4.E)
//!
//! The heart of the broadcast: a dedicated OS thread (not a tokio task)
//! that decodes one asset at a time, normalizes loudness, applies fades
//! for chopped windows, feeds a single persistent MP3 encoder, and pushes
//! the result to Icecast over a blocking socket. Gaplessness falls out of
//! never flushing the encoder between assets — the same mechanism as the
//! teacher's `audio_broadcaster::spawn_encoder_thread`, generalized from
//! HLS segment production to a continuous Icecast push.

#![allow(dead_code)]

use crate::config::Config;
use crate::models::{AssetKind, Command, NowPlaying, PlaybackItem};
use crate::services::dsp::{self, OUTPUT_CHANNELS, OUTPUT_SAMPLE_RATE};
use crate::services::icecast_source::IcecastSource;
use crate::services::{AssetIndex, CommandChannel, Director, HistoryStore, ScheduleResolver, StatePublisher};
use chrono::Timelike;
use mp3lame_encoder::{Builder, InterleavedPcm};
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, error, info, warn};

const FADE_SECS: f32 = 8.0;
/// Backoff between Icecast reconnect attempts, per §4.E invariant 6.
const ICECAST_RECONNECT_BACKOFF: Duration = Duration::from_secs(10);

enum EncoderMessage {
    Encode(Vec<f32>),
    Reset,
    Shutdown,
}

fn spawn_encoder_thread() -> (std::sync::mpsc::Sender<EncoderMessage>, std::sync::mpsc::Receiver<Vec<u8>>) {
    let (tx, rx) = std::sync::mpsc::channel::<EncoderMessage>();
    let (out_tx, out_rx) = std::sync::mpsc::channel::<Vec<u8>>();

    std::thread::spawn(move || {
        let mut encoder = build_encoder();
        for msg in rx {
            match msg {
                EncoderMessage::Encode(samples) => {
                    let data = encode_samples(&mut encoder, &samples);
                    if out_tx.send(data).is_err() {
                        break;
                    }
                }
                EncoderMessage::Reset => {
                    encoder = build_encoder();
                    debug!("encoder reset after skip");
                }
                EncoderMessage::Shutdown => break,
            }
        }
        info!("encoder thread shutting down");
    });

    (tx, out_rx)
}

fn build_encoder() -> mp3lame_encoder::Encoder {
    let mut builder = Builder::new().expect("failed to create mp3 encoder builder");
    builder.set_num_channels(OUTPUT_CHANNELS as u8).expect("failed to set channels");
    builder.set_sample_rate(OUTPUT_SAMPLE_RATE).expect("failed to set sample rate");
    builder.set_brate(mp3lame_encoder::Birtate::Kbps192).expect("failed to set bitrate");
    builder.set_quality(mp3lame_encoder::Quality::Best).expect("failed to set quality");
    builder.build().expect("failed to build mp3 encoder")
}

fn encode_samples(encoder: &mut mp3lame_encoder::Encoder, samples: &[f32]) -> Vec<u8> {
    let pcm: Vec<i16> = samples.iter().map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16).collect();
    let buffer_size = (pcm.len() as f32 * 1.25) as usize + 7200;
    let mut buffer: Vec<MaybeUninit<u8>> = vec![MaybeUninit::uninit(); buffer_size];

    let written = match encoder.encode(InterleavedPcm(&pcm), &mut buffer) {
        Ok(n) => n,
        Err(e) => {
            error!("mp3 encoding failed: {:?}", e);
            return Vec::new();
        }
    };
    if written > buffer_size {
        error!("mp3 encoder reported {} bytes, exceeds buffer {}", written, buffer_size);
        return Vec::new();
    }

    let mut out = Vec::with_capacity(written);
    unsafe {
        out.extend_from_slice(std::slice::from_raw_parts(buffer.as_ptr() as *const u8, written));
    }
    out
}

pub struct StreamingEngine {
    config: Config,
    index: Arc<AssetIndex>,
    history: Arc<HistoryStore>,
    schedule: Arc<ScheduleResolver>,
    commands: Arc<CommandChannel>,
    publisher: Arc<StatePublisher>,
    director: tokio::sync::Mutex<Director>,
    icecast_handle: Mutex<Option<IcecastSource>>,
    running: Arc<AtomicBool>,
    forced_skip: Arc<AtomicBool>,
}

impl StreamingEngine {
    pub fn new(
        config: Config,
        index: Arc<AssetIndex>,
        history: Arc<HistoryStore>,
        schedule: Arc<ScheduleResolver>,
        commands: Arc<CommandChannel>,
        publisher: Arc<StatePublisher>,
    ) -> Self {
        let director = tokio::sync::Mutex::new(Director::new(index.clone(), history.clone()));
        Self {
            config,
            index,
            history,
            schedule,
            commands,
            publisher,
            director,
            icecast_handle: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
            forced_skip: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn request_skip(&self) {
        self.forced_skip.store(true, Ordering::SeqCst);
    }

    /// Spawn the dedicated streaming thread. `rt` is the tokio runtime
    /// handle used to bridge async-only services (history, schedule,
    /// index, publisher, command channel) from the synchronous loop —
    /// the mirror image of the teacher's `spawn_blocking` bridge in the
    /// other direction.
    pub fn start(self: Arc<Self>, rt: tokio::runtime::Handle) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        std::thread::spawn(move || {
            info!("streaming engine thread starting");
            let (encoder_tx, encoder_rx) = spawn_encoder_thread();

            while self.running.load(Ordering::Relaxed) {
                let now = chrono::Local::now().naive_local();

                let show = match self.schedule.resolve(now) {
                    Ok(s) => s,
                    Err(e) => {
                        error!("schedule resolution failed: {}", e);
                        std::thread::sleep(std::time::Duration::from_secs(5));
                        continue;
                    }
                };

                if let Some(cmd) = rt.block_on(self.commands.poll()) {
                    rt.block_on(self.apply_command_to_director(cmd));
                }

                let podcast_hour_due = self.schedule.podcast_hour_due(now.hour());

                let item = match rt.block_on(self.next_item(&show, now, podcast_hour_due)) {
                    Some(item) => item,
                    None => {
                        warn!("director produced no playable item, backing off");
                        std::thread::sleep(std::time::Duration::from_secs(2));
                        continue;
                    }
                };

                rt.block_on(self.publish_now_playing(&item, &show));

                match self.play_item(&item, &encoder_tx, &encoder_rx, &rt) {
                    Ok(true) => {
                        rt.block_on(self.record_play(&item, &show));
                        rt.block_on(self.consume_if_single_use(&item));
                    }
                    Ok(false) => {
                        debug!("asset {:?} aborted mid-stream, not recording play", item.asset.path);
                    }
                    Err(e) => {
                        error!("failed to play {:?}: {}", item.asset.path, e);
                    }
                }
            }

            let _ = encoder_tx.send(EncoderMessage::Shutdown);
            info!("streaming engine thread stopped");
        });
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    async fn next_item(
        &self,
        show: &crate::models::ResolvedShow,
        now: chrono::NaiveDateTime,
        podcast_hour_due: bool,
    ) -> Option<PlaybackItem> {
        let mut director = self.director_guard().await;
        director.next(show, now, podcast_hour_due).await
    }

    async fn apply_command_to_director(&self, command: Command) {
        let mut director = self.director_guard().await;
        if command == Command::Skip {
            self.forced_skip.store(true, Ordering::SeqCst);
        }
        director.apply_command(command);
    }

    async fn director_guard(&self) -> tokio::sync::MutexGuard<'_, crate::services::Director> {
        self.director.lock().await
    }

    /// Delete a single-use segment (e.g. a listener dedication) from disk
    /// only once playback has been confirmed complete — never at
    /// selection time, so an aborted/skipped asset is never lost.
    async fn consume_if_single_use(&self, item: &PlaybackItem) {
        if item.asset.segment_type.map(|t| t.is_single_use()).unwrap_or(false) {
            if let Err(e) = self.index.consume_single_use(&item.asset).await {
                warn!("failed to remove single-use segment {:?}: {}", item.asset.path, e);
            }
        }
    }

    async fn publish_now_playing(&self, item: &PlaybackItem, show: &crate::models::ResolvedShow) {
        let now_playing = NowPlaying {
            track: Some(item.asset.file_stem()),
            artist: None,
            kind: Some(kind_label(item.kind).to_string()),
            vibe: item.asset.mood.map(|m| format!("{:?}", m.vibe)),
            listeners: self.publisher.cached_listener_count().await,
            show: Some(show.show.name.clone()),
            started_at: Some(chrono::Utc::now()),
        };
        if let Err(e) = self.publisher.publish(&now_playing).await {
            warn!("failed to publish now-playing state: {}", e);
        }
    }

    async fn record_play(&self, item: &PlaybackItem, show: &crate::models::ResolvedShow) {
        let listeners = self.publisher.cached_listener_count().await as i64;
        let vibe = item.asset.mood.map(|m| format!("{:?}", m.vibe)).unwrap_or_else(|| "unknown".into());
        self.history
            .record_play(
                &item.asset.path.to_string_lossy(),
                &item.asset.file_stem(),
                "unknown",
                &vibe,
                &show.show.name,
                listeners,
            )
            .await;
    }

    /// Decode, normalize, fade, encode, and push one playback item.
    /// Blocking throughout by design: this runs on the dedicated
    /// streaming thread, never the tokio runtime. Polls the command
    /// channel between PCM chunks so a `skip` can abort the asset
    /// currently streaming rather than waiting for it to finish
    /// naturally. Returns `Ok(true)` if the asset played to completion,
    /// `Ok(false)` if it was aborted by a skip or shutdown.
    fn play_item(
        &self,
        item: &PlaybackItem,
        encoder_tx: &std::sync::mpsc::Sender<EncoderMessage>,
        encoder_rx: &std::sync::mpsc::Receiver<Vec<u8>>,
        rt: &tokio::runtime::Handle,
    ) -> std::io::Result<bool> {
        if self.forced_skip.swap(false, Ordering::SeqCst) {
            let _ = encoder_tx.send(EncoderMessage::Reset);
        }

        let mut samples = decode_window(item).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e)
        })?;

        dsp::normalize_loudness(&mut samples, item.is_speech);
        if item.play_duration.is_some() {
            dsp::fade_in(&mut samples, FADE_SECS);
            dsp::fade_out(&mut samples, FADE_SECS);
        }

        const CHUNK_FRAMES: usize = 1152 * OUTPUT_CHANNELS * 8;
        for chunk in samples.chunks(CHUNK_FRAMES) {
            if !self.running.load(Ordering::Relaxed) {
                return Ok(false);
            }

            // Poll between chunks, not once per asset: a `skip` must abort
            // the asset currently streaming, not merely the next one.
            if let Some(cmd) = rt.block_on(self.commands.poll()) {
                rt.block_on(self.apply_command_to_director(cmd));
            }
            if self.forced_skip.swap(false, Ordering::SeqCst) {
                let _ = encoder_tx.send(EncoderMessage::Reset);
                return Ok(false);
            }

            if encoder_tx.send(EncoderMessage::Encode(chunk.to_vec())).is_err() {
                return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "encoder thread gone"));
            }
            let mp3 = encoder_rx.recv().map_err(|_| {
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, "encoder thread disconnected")
            })?;
            if !mp3.is_empty() {
                self.write_to_icecast(&mp3)?;
            }
        }
        Ok(true)
    }

    /// Push one encoded chunk to Icecast, transparently reconnecting with
    /// backoff if the cached connection is dead or missing. On a broken
    /// pipe the dead connection is dropped so the next call rebuilds it
    /// rather than handing the same dead socket back forever.
    fn write_to_icecast(&self, mp3: &[u8]) -> std::io::Result<()> {
        loop {
            {
                let mut guard = self.icecast_handle.lock().expect("icecast mutex poisoned");
                if let Some(source) = guard.as_mut() {
                    match source.write_chunk(mp3) {
                        Ok(()) => return Ok(()),
                        Err(e) => {
                            warn!("icecast write failed, dropping connection and reconnecting: {}", e);
                            *guard = None;
                        }
                    }
                }
            }
            if !self.running.load(Ordering::Relaxed) {
                return Err(std::io::Error::new(std::io::ErrorKind::NotConnected, "streaming engine shutting down"));
            }
            self.reconnect_icecast_with_backoff();
        }
    }

    /// Block until a fresh Icecast connection is cached, retrying every
    /// `ICECAST_RECONNECT_BACKOFF` indefinitely, or until shutdown.
    fn reconnect_icecast_with_backoff(&self) {
        loop {
            if !self.running.load(Ordering::Relaxed) {
                return;
            }
            match IcecastSource::connect(&self.config) {
                Ok(source) => {
                    info!("connected to icecast");
                    *self.icecast_handle.lock().expect("icecast mutex poisoned") = Some(source);
                    return;
                }
                Err(e) => {
                    error!("failed to connect to icecast, retrying in {:?}: {}", ICECAST_RECONNECT_BACKOFF, e);
                    std::thread::sleep(ICECAST_RECONNECT_BACKOFF);
                }
            }
        }
    }
}

fn kind_label(kind: AssetKind) -> &'static str {
    match kind {
        AssetKind::Music => "music",
        AssetKind::Segment => "segment",
        AssetKind::Podcast => "podcast",
        AssetKind::ShowAsset => "show",
    }
}

/// Decode an asset and slice out its configured playback window
/// (`start_offset`..`start_offset + play_duration`, or the whole track).
fn decode_window(item: &PlaybackItem) -> anyhow::Result<Vec<f32>> {
    let samples = decode_file(&item.asset.path)?;
    let Some(play_duration) = item.play_duration else {
        return Ok(samples);
    };

    let start_frame = (item.start_offset.as_secs_f32() * OUTPUT_SAMPLE_RATE as f32) as usize * OUTPUT_CHANNELS;
    let frame_count = (play_duration.as_secs_f32() * OUTPUT_SAMPLE_RATE as f32) as usize * OUTPUT_CHANNELS;
    let end_frame = (start_frame + frame_count).min(samples.len());
    let start_frame = start_frame.min(end_frame);
    Ok(samples[start_frame..end_frame].to_vec())
}

/// Decode a local audio file to interleaved f32 PCM at the output rate,
/// generalizing the teacher's `decode_audio` from an HTTP-fetched byte
/// buffer to a local `File` source.
fn decode_file(path: &std::path::Path) -> anyhow::Result<Vec<f32>> {
    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let probed = symphonia::default::get_probe().format(
        &Hint::new(),
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| anyhow::anyhow!("no audio track found in {:?}", path))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs().make(&codec_params, &DecoderOptions::default())?;

    let mut samples: Vec<f32> = Vec::new();
    let source_rate = codec_params.sample_rate.unwrap_or(OUTPUT_SAMPLE_RATE);
    let source_channels = codec_params.channels.map(|c| c.count()).unwrap_or(2);

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                warn!("error reading packet from {:?}: {}", path, e);
                break;
            }
        };
        if packet.track_id() != track_id {
            continue;
        }
        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e) => {
                warn!("error decoding packet from {:?}: {}", path, e);
                continue;
            }
        };
        let spec = *decoded.spec();
        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);
        let packet_samples = buf.samples();

        if source_channels == OUTPUT_CHANNELS {
            samples.extend_from_slice(packet_samples);
        } else if source_channels == 1 {
            for &s in packet_samples {
                samples.push(s);
                samples.push(s);
            }
        } else {
            for chunk in packet_samples.chunks(source_channels) {
                samples.push(chunk[0]);
                samples.push(*chunk.get(1).unwrap_or(&chunk[0]));
            }
        }
    }

    if source_rate != OUTPUT_SAMPLE_RATE {
        samples = resample(&samples, source_rate, OUTPUT_SAMPLE_RATE, OUTPUT_CHANNELS);
    }

    Ok(samples)
}

/// Linear interpolation resampling, kept verbatim in shape from the
/// teacher's `AudioPipeline::resample`.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32, channels: usize) -> Vec<f32> {
    let ratio = from_rate as f64 / to_rate as f64;
    let input_frames = samples.len() / channels;
    if input_frames == 0 {
        return Vec::new();
    }
    let output_frames = (input_frames as f64 / ratio) as usize;
    let mut output = Vec::with_capacity(output_frames * channels);

    for frame in 0..output_frames {
        let src_pos = frame as f64 * ratio;
        let src_frame = src_pos.floor() as usize;
        let next_frame = (src_frame + 1).min(input_frames - 1);
        let frac = (src_pos - src_frame as f64) as f32;
        for ch in 0..channels {
            let curr = samples[src_frame * channels + ch];
            let next = samples[next_frame * channels + ch];
            output.push(curr * (1.0 - frac) + next * frac);
        }
    }
    output
}
