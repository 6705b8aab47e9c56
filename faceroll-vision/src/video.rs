use anyhow::{bail, ensure, Context, Result};
use image::RgbImage;
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};

const RGB3: FourCC = FourCC { repr: *b"RGB3" };
const YUYV: FourCC = FourCC { repr: *b"YUYV" };
const GREY: FourCC = FourCC { repr: *b"GREY" };

/// V4L2 webcam delivering RGB still frames.
pub struct Camera {
    stream: Stream<'static>,
    width: u32,
    height: u32,
    fourcc: FourCC,
}

impl Camera {
    pub fn open(device: &str) -> Result<Self> {
        let dev = Device::with_path(device).with_context(|| format!("open camera {device}"))?;
        let mut fmt = dev.format().context("get format")?;
        // Prefer RGB, fall back to YUYV, else keep whatever the device offers.
        for fourcc in [RGB3, YUYV] {
            if fmt.fourcc == fourcc {
                break;
            }
            let desired = Format::new(fmt.width, fmt.height, fourcc);
            fmt = dev.set_format(&desired).unwrap_or(fmt);
        }
        log::info!(
            "camera {device}: {}x{} {}",
            fmt.width,
            fmt.height,
            fmt.fourcc
        );
        let stream = Stream::with_buffers(&dev, Type::VideoCapture, 4).context("stream")?;
        Ok(Self {
            stream,
            width: fmt.width,
            height: fmt.height,
            fourcc: fmt.fourcc,
        })
    }

    pub fn frame(&mut self) -> Result<RgbImage> {
        let (data, meta) = self.stream.next().context("capture frame")?;
        log::debug!(
            "captured frame: seq={} len={}",
            meta.sequence,
            data.len()
        );
        let rgb = to_rgb(self.fourcc, self.width, self.height, data)?;
        RgbImage::from_raw(self.width, self.height, rgb)
            .context("frame does not match the negotiated size")
    }

    /// Single still image, after discarding `warmup` frames while exposure settles.
    pub fn still(&mut self, warmup: usize) -> Result<RgbImage> {
        for _ in 0..warmup {
            self.stream.next().context("warmup frame")?;
        }
        self.frame()
    }
}

fn to_rgb(fourcc: FourCC, width: u32, height: u32, data: &[u8]) -> Result<Vec<u8>> {
    let pixels = (width * height) as usize;
    match fourcc {
        f if f == RGB3 => {
            ensure!(data.len() >= pixels * 3, "short RGB3 buffer");
            Ok(data[..pixels * 3].to_vec())
        }
        f if f == YUYV => yuyv_to_rgb(pixels, data),
        f if f == GREY => grey_to_rgb(pixels, data),
        other => bail!("unsupported pixel format {other}"),
    }
}

fn yuyv_to_rgb(pixels: usize, data: &[u8]) -> Result<Vec<u8>> {
    ensure!(data.len() >= pixels * 2, "short YUYV buffer");
    let mut out = Vec::with_capacity(pixels * 3);
    for chunk in data[..pixels * 2].chunks_exact(4) {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;
        for y in [chunk[0] as f32, chunk[2] as f32] {
            out.push(channel(y + 1.402 * v));
            out.push(channel(y - 0.344136 * u - 0.714136 * v));
            out.push(channel(y + 1.772 * u));
        }
    }
    Ok(out)
}

fn grey_to_rgb(pixels: usize, data: &[u8]) -> Result<Vec<u8>> {
    ensure!(data.len() >= pixels, "short GREY buffer");
    Ok(data[..pixels].iter().flat_map(|&y| [y, y, y]).collect())
}

fn channel(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
