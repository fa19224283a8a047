use crate::frame::RawFrame;

/// Raw-frame checks the trust validator delegates to
///
/// Every method may decline with `None` when it cannot judge the frame; the
/// validator counts that as a skipped check rather than a violation.
pub trait FrameInspector: Send + Sync {
    /// Stable identifier of the capture device that produced the frame
    fn compute_fingerprint(&self, frame: &RawFrame) -> Option<String>;

    /// Mean visual change between two frames, per second of capture time
    fn estimate_motion(&self, previous: &RawFrame, current: &RawFrame) -> Option<f32>;

    /// Whether two frames are visually identical
    fn is_frame_static(&self, previous: &RawFrame, current: &RawFrame) -> Option<bool>;
}

#[cfg(feature = "frame_analysis")]
pub use pixel::PixelFrameInspector;

#[cfg(feature = "frame_analysis")]
mod pixel {
    use super::FrameInspector;
    use crate::frame::{FrameFormat, RawFrame};
    use image::imageops::{self, FilterType};
    use image::{GrayImage, Luma, RgbImage};
    use imageproc::filter::gaussian_blur_f32;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    use tracing::{debug, trace};

    const THUMBNAIL_WIDTH: u32 = 64;
    const THUMBNAIL_HEIGHT: u32 = 48;

    /// Frame inspector working on blurred grayscale thumbnails
    #[derive(Debug, Clone)]
    pub struct PixelFrameInspector {
        static_threshold: f32,
    }

    impl PixelFrameInspector {
        /// `static_threshold` is the mean normalized difference under which frames match
        pub fn new(static_threshold: f32) -> Self {
            Self { static_threshold }
        }

        fn thumbnail(&self, frame: &RawFrame) -> Option<GrayImage> {
            if frame.is_empty() {
                return None;
            }
            let gray = match frame.format {
                FrameFormat::Gray8 => {
                    GrayImage::from_raw(frame.width, frame.height, frame.data.to_vec())
                }
                FrameFormat::Rgb24 => rgb24_to_gray(frame),
                FrameFormat::Yuyv => Some(yuyv_to_gray(frame)),
                FrameFormat::Mjpeg => match image::load_from_memory(&frame.data) {
                    Ok(decoded) => Some(decoded.to_luma8()),
                    Err(e) => {
                        debug!("MJPEG decode failed for frame {}: {}", frame.id, e);
                        None
                    }
                },
            }?;

            let small = imageops::resize(&gray, THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT, FilterType::Triangle);
            Some(gaussian_blur_f32(&small, 1.0))
        }

        /// Mean absolute pixel difference scaled to 0-1
        fn difference(&self, previous: &RawFrame, current: &RawFrame) -> Option<f32> {
            let a = self.thumbnail(previous)?;
            let b = self.thumbnail(current)?;
            let total: u64 = a
                .pixels()
                .zip(b.pixels())
                .map(|(pa, pb)| (pa[0] as i16 - pb[0] as i16).unsigned_abs() as u64)
                .sum();
            let pixels = (THUMBNAIL_WIDTH * THUMBNAIL_HEIGHT) as f32;
            let diff = total as f32 / pixels / 255.0;
            trace!("Frames {} -> {} differ by {:.4}", previous.id, current.id, diff);
            Some(diff)
        }
    }

    impl Default for PixelFrameInspector {
        fn default() -> Self {
            Self::new(0.002)
        }
    }

    impl FrameInspector for PixelFrameInspector {
        fn compute_fingerprint(&self, frame: &RawFrame) -> Option<String> {
            if frame.width == 0 || frame.height == 0 {
                return None;
            }
            let mut hasher = DefaultHasher::new();
            frame.device_id.hash(&mut hasher);
            frame.format.hash(&mut hasher);
            (frame.width, frame.height).hash(&mut hasher);
            Some(format!("{:016x}", hasher.finish()))
        }

        fn estimate_motion(&self, previous: &RawFrame, current: &RawFrame) -> Option<f32> {
            let elapsed = current.timestamp.duration_since(previous.timestamp).ok()?;
            if elapsed.is_zero() {
                return None;
            }
            Some(self.difference(previous, current)? / elapsed.as_secs_f32())
        }

        fn is_frame_static(&self, previous: &RawFrame, current: &RawFrame) -> Option<bool> {
            Some(self.difference(previous, current)? < self.static_threshold)
        }
    }

    fn yuyv_to_gray(frame: &RawFrame) -> GrayImage {
        let (width, height) = (frame.width, frame.height);
        let mut gray_image = GrayImage::new(width, height);

        // Y0 U Y1 V: 4 bytes for 2 pixels
        for y in 0..height {
            for x in 0..(width / 2) {
                let base_idx = ((y * width / 2 + x) * 4) as usize;
                if base_idx + 3 < frame.data.len() {
                    gray_image.put_pixel(x * 2, y, Luma([frame.data[base_idx]]));
                    if x * 2 + 1 < width {
                        gray_image.put_pixel(x * 2 + 1, y, Luma([frame.data[base_idx + 2]]));
                    }
                }
            }
        }

        gray_image
    }

    fn rgb24_to_gray(frame: &RawFrame) -> Option<GrayImage> {
        let rgb_image = RgbImage::from_raw(frame.width, frame.height, frame.data.to_vec())?;
        let mut gray_image = GrayImage::new(frame.width, frame.height);
        for (x, y, rgb) in rgb_image.enumerate_pixels() {
            let gray_value =
                (0.299 * rgb[0] as f32 + 0.587 * rgb[1] as f32 + 0.114 * rgb[2] as f32) as u8;
            gray_image.put_pixel(x, y, Luma([gray_value]));
        }
        Some(gray_image)
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::time::{Duration, SystemTime};

        fn gray_frame(id: u64, timestamp: SystemTime, fill: impl Fn(u32, u32) -> u8) -> RawFrame {
            let (width, height) = (32u32, 24u32);
            let mut data = Vec::with_capacity((width * height) as usize);
            for y in 0..height {
                for x in 0..width {
                    data.push(fill(x, y));
                }
            }
            RawFrame::new(id, timestamp, data, width, height, FrameFormat::Gray8)
        }

        #[test]
        fn test_identical_frames_are_static() {
            let inspector = PixelFrameInspector::default();
            let now = SystemTime::now();
            let a = gray_frame(1, now, |x, _| (x * 8) as u8);
            let b = gray_frame(2, now + Duration::from_millis(100), |x, _| (x * 8) as u8);

            assert_eq!(inspector.is_frame_static(&a, &b), Some(true));
            assert_eq!(inspector.estimate_motion(&a, &b), Some(0.0));
        }

        #[test]
        fn test_changed_frames_move() {
            let inspector = PixelFrameInspector::default();
            let now = SystemTime::now();
            let dark = gray_frame(1, now, |_, _| 0);
            let bright = gray_frame(2, now + Duration::from_millis(500), |_, _| 255);

            assert_eq!(inspector.is_frame_static(&dark, &bright), Some(false));
            let motion = inspector.estimate_motion(&dark, &bright).unwrap();
            // Full-frame change in half a second
            assert!((motion - 2.0).abs() < 0.05, "motion was {}", motion);
        }

        #[test]
        fn test_motion_needs_forward_time() {
            let inspector = PixelFrameInspector::default();
            let now = SystemTime::now();
            let a = gray_frame(1, now, |_, _| 10);
            let b = gray_frame(2, now, |_, _| 200);
            assert_eq!(inspector.estimate_motion(&a, &b), None);
            assert_eq!(inspector.estimate_motion(&b, &a), None);
        }

        #[test]
        fn test_fingerprint_tracks_device() {
            let inspector = PixelFrameInspector::default();
            let now = SystemTime::now();
            let a = gray_frame(1, now, |_, _| 0).with_device_id("usb-cam-1");
            let b = gray_frame(2, now, |_, _| 90).with_device_id("usb-cam-1");
            let c = gray_frame(3, now, |_, _| 0).with_device_id("obs-virtual");

            let fa = inspector.compute_fingerprint(&a).unwrap();
            assert_eq!(Some(fa.clone()), inspector.compute_fingerprint(&b));
            assert_ne!(Some(fa), inspector.compute_fingerprint(&c));
        }

        #[test]
        fn test_truncated_frames_are_declined() {
            let inspector = PixelFrameInspector::default();
            let now = SystemTime::now();
            let good = gray_frame(1, now, |_, _| 0);
            let bad = RawFrame::new(2, now, vec![0; 5], 32, 24, FrameFormat::Gray8);
            assert_eq!(inspector.is_frame_static(&good, &bad), None);

            let yuyv = RawFrame::new(3, now, vec![0; 32 * 24 * 2], 32, 24, FrameFormat::Yuyv);
            let rgb = RawFrame::new(4, now, vec![0; 32 * 24 * 3], 32, 24, FrameFormat::Rgb24);
            assert_eq!(inspector.is_frame_static(&yuyv, &rgb), Some(true));
        }
    }
}
