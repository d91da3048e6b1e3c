use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, BresenhamLineIter};

pub const CANNY_LOW_THRESHOLD: f32 = 50.0;
pub const CANNY_HIGH_THRESHOLD: f32 = 150.0;

/// A destructive edit applied through the session. Every variant pushes a
/// history snapshot before it runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation {
    Grayscale,
    Blur { kernel_size: u32 },
    EdgeDetect,
    BrightnessContrast { brightness: i32, contrast: i32 },
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Blur { kernel_size } => {
                write!(f, "{} ({}x{})", self.name(), kernel_size, kernel_size)
            }
            Operation::BrightnessContrast { brightness, contrast } => {
                write!(f, "{} ({:+}, {:+})", self.name(), brightness, contrast)
            }
            _ => write!(f, "{}", self.name()),
        }
    }
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Grayscale => "Grayscale",
            Operation::Blur { .. } => "Gaussian Blur",
            Operation::EdgeDetect => "Edge Detection",
            Operation::BrightnessContrast { .. } => "Brightness/Contrast",
        }
    }

    /// Brightness/contrast is recomputed from the untouched source so that
    /// repeated slider moves do not compound. Everything else builds on the
    /// current image.
    pub fn reads_source(&self) -> bool {
        matches!(self, Operation::BrightnessContrast { .. })
    }

    pub fn run(&self, input: &RgbImage) -> RgbImage {
        match *self {
            Operation::Grayscale => to_color(&to_grayscale(input)),
            Operation::Blur { kernel_size } => gaussian_blur(input, kernel_size),
            Operation::EdgeDetect => to_color(&canny_edges(
                &to_grayscale(input),
                CANNY_LOW_THRESHOLD,
                CANNY_HIGH_THRESHOLD,
            )),
            Operation::BrightnessContrast { brightness, contrast } => {
                brightness_contrast(input, brightness, contrast)
            }
        }
    }
}

pub fn to_grayscale(image: &RgbImage) -> GrayImage {
    image::imageops::grayscale(image)
}

pub fn to_color(image: &GrayImage) -> RgbImage {
    DynamicImage::ImageLuma8(image.clone()).to_rgb8()
}

/// Blur kernels must be odd; even sizes are bumped up by one and zero becomes 1.
pub fn normalize_kernel_size(requested: u32) -> u32 {
    if requested % 2 == 1 {
        requested
    } else {
        requested + 1
    }
}

/// Sigma derived from the kernel size when the caller does not choose one.
pub fn sigma_for_kernel(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

fn gaussian_kernel(kernel_size: u32) -> Vec<f32> {
    let sigma = sigma_for_kernel(kernel_size);
    let radius = (kernel_size / 2) as i32;
    let weights: Vec<f32> = (-radius..=radius)
        .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let total: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

pub fn gaussian_blur(image: &RgbImage, kernel_size: u32) -> RgbImage {
    let kernel_size = normalize_kernel_size(kernel_size);
    if kernel_size == 1 {
        return image.clone();
    }

    let kernel = gaussian_kernel(kernel_size);
    imageproc::filter::separable_filter_equal(image, &kernel)
}

pub fn canny_edges(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    imageproc::edges::canny(image, low_threshold, high_threshold)
}

/// `out = v * (contrast / 100 + 1) - contrast + brightness`, clipped to 0..=255
/// and truncated.
///
/// Evaluated in f64 in exactly that order: results that land on an integer
/// must not drop a level to rounding.
pub fn brightness_contrast(image: &RgbImage, brightness: i32, contrast: i32) -> RgbImage {
    let gain = contrast as f64 / 100.0 + 1.0;
    let contrast = contrast as f64;
    let brightness = brightness as f64;

    let mut lut = [0u8; 256];
    for (value, slot) in lut.iter_mut().enumerate() {
        *slot = (value as f64 * gain - contrast + brightness).clamp(0.0, 255.0) as u8;
    }

    let mut result = image.clone();
    for pixel in result.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            *channel = lut[*channel as usize];
        }
    }
    result
}

/// Draws a round-capped segment of the given width directly into `image`.
/// Points outside the image are clipped.
///
/// The stroke is stamped with filled circles of radius `width / 2`, so its
/// thickness is always odd: odd widths are exact and even widths round up by
/// one pixel.
pub fn draw_line(image: &mut RgbImage, from: (i32, i32), to: (i32, i32), color: Rgb<u8>, width: u32) {
    let start = (from.0 as f32, from.1 as f32);
    let end = (to.0 as f32, to.1 as f32);

    if width <= 1 {
        draw_line_segment_mut(image, start, end, color);
        return;
    }

    let radius = (width / 2) as i32;
    for point in BresenhamLineIter::new(start, end) {
        draw_filled_circle_mut(image, point, radius, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageBuffer;

    fn checkerboard(width: u32, height: u32) -> RgbImage {
        ImageBuffer::from_fn(width, height, |x, y| {
            if (x / 4 + y / 4) % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        })
    }

    #[test]
    fn test_kernel_normalization() {
        assert_eq!(normalize_kernel_size(0), 1);
        assert_eq!(normalize_kernel_size(1), 1);
        assert_eq!(normalize_kernel_size(4), 5);
        assert_eq!(normalize_kernel_size(5), 5);
        assert_eq!(normalize_kernel_size(20), 21);

        for k in 0..64 {
            let effective = normalize_kernel_size(k);
            assert!(effective >= 1);
            assert_eq!(effective % 2, 1);
            assert!(effective == k || effective == k + 1);
        }
    }

    #[test]
    fn test_gaussian_kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel(7);
        assert_eq!(kernel.len(), 7);
        let total: f32 = kernel.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert!((kernel[0] - kernel[6]).abs() < 1e-6);
        assert!(kernel[3] > kernel[2]);
    }

    #[test]
    fn test_blur_size_one_is_identity() {
        let image = checkerboard(16, 16);
        assert_eq!(gaussian_blur(&image, 1), image);
        assert_eq!(gaussian_blur(&image, 0), image);
    }

    #[test]
    fn test_blur_softens_edges() {
        let image = checkerboard(16, 16);
        let blurred = gaussian_blur(&image, 5);
        assert_eq!(blurred.dimensions(), image.dimensions());
        // Pixel next to a black/white boundary picks up some of the neighbour
        let edge = blurred.get_pixel(3, 1)[0];
        assert!(edge > 0 && edge < 255);
    }

    #[test]
    fn test_grayscale_is_three_channel_and_neutral() {
        let image = ImageBuffer::from_pixel(8, 8, Rgb([200, 30, 90]));
        let gray = Operation::Grayscale.run(&image);
        assert_eq!(gray.dimensions(), (8, 8));
        let p = gray.get_pixel(4, 4);
        assert_eq!(p[0], p[1]);
        assert_eq!(p[1], p[2]);
    }

    #[test]
    fn test_edges_on_flat_image_are_empty() {
        let image = ImageBuffer::from_pixel(32, 32, Rgb([255, 0, 0]));
        let edges = Operation::EdgeDetect.run(&image);
        assert!(edges.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn test_edges_find_a_step() {
        let image = ImageBuffer::from_fn(32, 32, |x, _| {
            if x < 16 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) }
        });
        let edges = Operation::EdgeDetect.run(&image);
        assert!(edges.pixels().any(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn test_brightness_contrast_formula() {
        let image = ImageBuffer::from_pixel(2, 2, Rgb([100, 0, 250]));

        let brighter = brightness_contrast(&image, 20, 0);
        assert_eq!(brighter.get_pixel(0, 0).0, [120, 20, 255]);

        // 100 * 1.5 - 50 = 100, 0 * 1.5 - 50 clips to 0, 250 * 1.5 - 50 clips to 255
        let contrasted = brightness_contrast(&image, 0, 50);
        assert_eq!(contrasted.get_pixel(1, 1).0, [100, 0, 255]);

        let darker = brightness_contrast(&image, -100, 0);
        assert_eq!(darker.get_pixel(0, 1).0, [0, 0, 150]);
    }

    #[test]
    fn test_brightness_contrast_integer_results_are_not_rounded_down() {
        // 100 * 0.01 + 99 - 99 is exactly 1; f32 arithmetic lands on 0.99...
        let image = RgbImage::from_pixel(1, 1, Rgb([100, 200, 100]));
        let adjusted = brightness_contrast(&image, -99, -99);
        assert_eq!(adjusted.get_pixel(0, 0).0, [1, 2, 1]);
    }

    #[test]
    fn test_brightness_contrast_neutral_is_identity() {
        let image = checkerboard(8, 8);
        assert_eq!(brightness_contrast(&image, 0, 0), image);
    }

    #[test]
    fn test_draw_line_thin_and_thick() {
        let mut image = RgbImage::new(20, 20);
        let red = Rgb([255, 0, 0]);

        draw_line(&mut image, (0, 10), (19, 10), red, 1);
        assert_eq!(*image.get_pixel(10, 10), red);
        assert_eq!(*image.get_pixel(10, 12), Rgb([0, 0, 0]));

        draw_line(&mut image, (0, 5), (19, 5), red, 5);
        assert_eq!(*image.get_pixel(10, 7), red);
        assert_eq!(*image.get_pixel(10, 3), red);
    }

    #[test]
    fn test_draw_line_thickness_rounds_to_odd() {
        let white = Rgb([255, 255, 255]);
        let rows_covered = |width: u32| {
            let mut image = RgbImage::new(20, 20);
            draw_line(&mut image, (5, 10), (15, 10), white, width);
            (0..20).filter(|&y| *image.get_pixel(10, y) == white).count()
        };

        assert_eq!(rows_covered(1), 1);
        assert_eq!(rows_covered(3), 3);
        assert_eq!(rows_covered(5), 5);
        assert_eq!(rows_covered(2), 3);
        assert_eq!(rows_covered(4), 5);
    }

    #[test]
    fn test_draw_line_clips_outside_points() {
        let mut image = RgbImage::new(10, 10);
        draw_line(&mut image, (-20, -20), (30, 30), Rgb([0, 255, 0]), 3);
        assert_eq!(*image.get_pixel(5, 5), Rgb([0, 255, 0]));
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::Grayscale.name(), "Grayscale");
        assert_eq!(Operation::Blur { kernel_size: 5 }.to_string(), "Gaussian Blur (5x5)");
        assert!(Operation::BrightnessContrast { brightness: 1, contrast: 2 }.reads_source());
        assert!(!Operation::EdgeDetect.reads_source());
    }
}
