//! Host audio output through cpal.
//!
//! The device is opened from the driver thread; cpal then calls back on its
//! own thread and the [`AudioBridge`] drains the machine's queue directly.
//! cpal does no conversion of its own, so when the device does not offer the
//! machine's rate or sample format this adapter resamples and converts. The
//! bridge always sees stereo i16 at the native rate.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    BufferSize, BuildStreamError, FromSample, SampleFormat, SampleRate, SizedSample, Stream,
    StreamConfig, SupportedBufferSize, SupportedStreamConfig, SupportedStreamConfigRange,
};
use tandem_core::audio::{AudioBridge, AudioOutput, AudioSpec, AudioStream, CHANNELS};
use tandem_core::error::AudioError;
use tracing::{debug, error, info};

/// Opens the host's default output device.
#[derive(Debug, Default)]
pub struct CpalOutput;

impl AudioOutput for CpalOutput {
    fn open(
        &mut self,
        spec: &AudioSpec,
        bridge: AudioBridge,
    ) -> Result<Box<dyn AudioStream>, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let ranges: Vec<SupportedStreamConfigRange> = device
            .supported_output_configs()
            .map_err(|err| AudioError::Stream(err.to_string()))?
            .collect();
        let supported = choose_config(&ranges, spec).ok_or_else(|| {
            AudioError::Unsupported(format!("no usable output format among {ranges:?}"))
        })?;
        let config = stream_config(&supported, spec);
        info!(
            device_rate = config.sample_rate.0,
            channels = config.channels,
            format = ?supported.sample_format(),
            native_rate = spec.sample_rate,
            "audio output configured"
        );

        let converter = Converter::new(bridge, spec.sample_rate, &config);
        let stream = match supported.sample_format() {
            SampleFormat::I16 => build_stream::<i16>(&device, &config, converter),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, converter),
            SampleFormat::F32 => build_stream::<f32>(&device, &config, converter),
            other => return Err(AudioError::Unsupported(format!("sample format {other:?}"))),
        }
        .map_err(|err| match err {
            BuildStreamError::StreamConfigNotSupported => {
                AudioError::Unsupported(format!("{config:?}"))
            }
            BuildStreamError::DeviceNotAvailable => AudioError::NoDevice,
            other => AudioError::Stream(other.to_string()),
        })?;

        stream
            .play()
            .map_err(|err| AudioError::Stream(err.to_string()))?;

        Ok(Box::new(CpalStream { stream }))
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut converter: Converter,
) -> Result<Stream, BuildStreamError>
where
    T: SizedSample + FromSample<i16> + 'static,
{
    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| converter.fill(data),
        |err| error!("audio stream error: {err}"),
        None,
    )
}

struct CpalStream {
    stream: Stream,
}

impl AudioStream for CpalStream {
    fn close(self: Box<Self>) {
        if let Err(err) = self.stream.pause() {
            debug!("pausing audio stream before close: {err}");
        }
    }
}

// ---------------------------------------------------------------------------
// Config selection
// ---------------------------------------------------------------------------

fn format_rank(format: SampleFormat) -> Option<u8> {
    match format {
        SampleFormat::I16 => Some(0),
        SampleFormat::F32 => Some(1),
        SampleFormat::U16 => Some(2),
        _ => None,
    }
}

/// Pick the device config closest to `spec`: stereo first, then the range
/// nearest the native rate, then the format needing the least conversion.
/// Rates outside a range are clamped to its nearest end.
fn choose_config(
    ranges: &[SupportedStreamConfigRange],
    spec: &AudioSpec,
) -> Option<SupportedStreamConfig> {
    let nearest_rate = |range: &SupportedStreamConfigRange| {
        spec.sample_rate
            .clamp(range.min_sample_rate().0, range.max_sample_rate().0)
    };
    ranges
        .iter()
        .filter_map(|range| {
            let format = format_rank(range.sample_format())?;
            let distance = spec.sample_rate.abs_diff(nearest_rate(range));
            Some(((range.channels() != spec.channels, distance, format), range))
        })
        .min_by_key(|(key, _)| *key)
        .map(|(_, range)| range.clone().with_sample_rate(SampleRate(nearest_rate(range))))
}

/// Request the spec's buffer size when the device allows it.
fn stream_config(supported: &SupportedStreamConfig, spec: &AudioSpec) -> StreamConfig {
    let mut config = supported.config();
    config.buffer_size = match supported.buffer_size() {
        SupportedBufferSize::Range { min, max }
            if (*min..=*max).contains(&spec.buffer_frames) =>
        {
            BufferSize::Fixed(spec.buffer_frames)
        }
        _ => BufferSize::Default,
    };
    config
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// Turns native-rate stereo i16 from the bridge into whatever the device
/// asked for. Linear interpolation between native frames when rates differ.
struct Converter {
    bridge: AudioBridge,
    /// Native frames per device frame.
    step: f64,
    /// Position between `prev` and `next`, in native frames.
    frac: f64,
    prev: [i16; 2],
    next: [i16; 2],
    device_channels: usize,
    native: Vec<i16>,
    stereo: Vec<i16>,
}

impl Converter {
    fn new(bridge: AudioBridge, native_rate: u32, config: &StreamConfig) -> Self {
        Self {
            bridge,
            step: native_rate as f64 / config.sample_rate.0 as f64,
            frac: 0.0,
            prev: [0; 2],
            next: [0; 2],
            device_channels: config.channels.max(1) as usize,
            native: Vec::new(),
            stereo: Vec::new(),
        }
    }

    fn fill<T: SizedSample + FromSample<i16>>(&mut self, out: &mut [T]) {
        let frames = out.len() / self.device_channels;
        self.fill_stereo(frames);

        let silence = T::from_sample(0i16);
        for (frame, lr) in out
            .chunks_exact_mut(self.device_channels)
            .zip(self.stereo.chunks_exact(CHANNELS as usize))
        {
            if let [mono] = &mut *frame {
                *mono = T::from_sample(((lr[0] as i32 + lr[1] as i32) / 2) as i16);
                continue;
            }
            for (ch, sample) in frame.iter_mut().enumerate() {
                *sample = lr.get(ch).map_or(silence, |&s| T::from_sample(s));
            }
        }
        for sample in out.iter_mut().skip(frames * self.device_channels) {
            *sample = silence;
        }
    }

    /// Produce `frames` stereo frames at the device rate into `self.stereo`.
    fn fill_stereo(&mut self, frames: usize) {
        self.stereo.resize(frames * 2, 0);
        if self.step == 1.0 {
            self.bridge.fill(&mut self.stereo);
            return;
        }

        // How many native frames this callback consumes.
        let mut needed = 0;
        let mut frac = self.frac;
        for _ in 0..frames {
            while frac >= 1.0 {
                needed += 1;
                frac -= 1.0;
            }
            frac += self.step;
        }
        self.native.resize(needed * 2, 0);
        if needed > 0 {
            self.bridge.fill(&mut self.native);
        }

        let mut pulled = self.native.chunks_exact(2);
        for out in self.stereo.chunks_exact_mut(2) {
            while self.frac >= 1.0 {
                self.prev = self.next;
                if let Some(frame) = pulled.next() {
                    self.next = [frame[0], frame[1]];
                }
                self.frac -= 1.0;
            }
            for ch in 0..2 {
                let a = self.prev[ch] as f64;
                let b = self.next[ch] as f64;
                out[ch] = (a + (b - a) * self.frac).round() as i16;
            }
            self.frac += self.step;
        }
    }
}
