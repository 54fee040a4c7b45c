// src/movie.rs
//
// Streams rendered frames into an external `ffmpeg` process as raw rgb24,
// so no intermediate PNG sequence is needed for the movie.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use tracing::{debug, warn};

use crate::config::MovieConfig;
use crate::error::{CompareError, Result};

/// Receives finished frames in display order.
pub trait FrameSink {
    fn push_frame(&mut self, index: usize, rgb: &[u8]) -> Result<()>;

    /// Flush and close. Returns the number of frames written.
    fn finish(&mut self) -> Result<usize>;
}

pub struct FfmpegEncoder {
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
    frame_len: usize,
    frames: usize,
    output: PathBuf,
}

/// Command-line arguments for an rgb24-on-stdin encode.
pub fn ffmpeg_args(settings: &MovieConfig, width: u32, height: u32, output: &Path) -> Vec<String> {
    vec![
        "-y".into(), // overwrite output if it exists
        "-loglevel".into(),
        "error".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgb24".into(),
        "-s".into(),
        format!("{width}x{height}"),
        "-framerate".into(),
        settings.fps.to_string(),
        "-i".into(),
        "-".into(),
        "-vcodec".into(),
        settings.codec.clone(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        output.to_string_lossy().into_owned(),
    ]
}

impl FfmpegEncoder {
    pub fn spawn(settings: &MovieConfig, width: u32, height: u32, output: &Path) -> Result<Self> {
        let args = ffmpeg_args(settings, width, height, output);
        debug!("spawning {} {}", settings.ffmpeg.display(), args.join(" "));

        let mut child = Command::new(&settings.ffmpeg)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|e| {
                CompareError::Encoder(format!(
                    "could not start {}: {e}",
                    settings.ffmpeg.display()
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CompareError::Encoder("ffmpeg stdin was not captured".into()))?;

        Ok(Self {
            child,
            stdin: Some(BufWriter::new(stdin)),
            frame_len: width as usize * height as usize * 3,
            frames: 0,
            output: output.to_path_buf(),
        })
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}

impl FrameSink for FfmpegEncoder {
    fn push_frame(&mut self, index: usize, rgb: &[u8]) -> Result<()> {
        if rgb.len() != self.frame_len {
            return Err(CompareError::FrameSize {
                expected: self.frame_len,
                found: rgb.len(),
            });
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| CompareError::Encoder("encoder already finished".into()))?;
        stdin.write_all(rgb).map_err(|e| {
            CompareError::Encoder(format!("writing frame {index} to ffmpeg failed: {e}"))
        })?;
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<usize> {
        // stdin is dropped at the end of the arm, closing the ffmpeg input
        let flushed = match self.stdin.take() {
            Some(mut stdin) => stdin.flush(),
            None => Ok(()),
        };
        let status = self
            .child
            .wait()
            .map_err(|e| CompareError::Encoder(format!("waiting for ffmpeg failed: {e}")))?;
        if !status.success() {
            return Err(CompareError::Encoder(format!(
                "ffmpeg exited with status {status}"
            )));
        }
        flushed.map_err(|e| {
            CompareError::Encoder(format!("flushing frames to ffmpeg failed ({status}): {e}"))
        })?;
        Ok(self.frames)
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        if self.stdin.take().is_some() {
            warn!("encoder dropped before finish; {} may be incomplete", self.output.display());
            let _ = self.child.wait();
        }
    }
}

/// Keeps frames in memory. Useful when the caller wants to post-process them.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub frames: Vec<(usize, Vec<u8>)>,
    pub finished: bool,
}

impl FrameSink for MemorySink {
    fn push_frame(&mut self, index: usize, rgb: &[u8]) -> Result<()> {
        self.frames.push((index, rgb.to_vec()));
        Ok(())
    }

    fn finish(&mut self) -> Result<usize> {
        self.finished = true;
        Ok(self.frames.len())
    }
}
