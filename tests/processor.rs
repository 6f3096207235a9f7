mod tests {
    use lightmux::color::{ColorOrder, Rgb};
    use lightmux::geometry::Led;
    use lightmux::image::ImageView;
    use lightmux::processor::{ImageProcessor, MappingType, ProcessError};

    const RED: Rgb = Rgb::new(255, 0, 0);
    const BLUE: Rgb = Rgb::new(0, 0, 255);
    const WHITE: Rgb = Rgb::new(255, 255, 255);
    const BLACK: Rgb = Rgb::new(0, 0, 0);

    fn led(h_min: f32, h_max: f32) -> Led {
        Led {
            h_min,
            h_max,
            v_min: 0.0,
            v_max: 1.0,
            order: ColorOrder::Rgb,
        }
    }

    #[test]
    fn test_solid_image_single_led() {
        let pixels = [BLUE; 4];
        let image = ImageView::new(2, 2, &pixels).unwrap();
        let mut processor = ImageProcessor::<4>::new(&[led(0.0, 1.0)]);

        let mut out = [BLACK; 1];
        for mapping in [MappingType::MulticolorMean, MappingType::UnicolorMean] {
            processor.set_mapping_type(mapping);
            processor.process(&image, &mut out).unwrap();
            assert_eq!(out[0], BLUE, "mapping {:?}", mapping);
        }
    }

    #[test]
    fn test_mapping_strategies_differ() {
        // Left column red, right column blue.
        let pixels = [RED, BLUE, RED, BLUE];
        let image = ImageView::new(2, 2, &pixels).unwrap();
        let mut processor = ImageProcessor::<4>::new(&[led(0.0, 0.5), led(0.5, 1.0)]);

        let mut out = [BLACK; 2];
        processor.process(&image, &mut out).unwrap();
        assert_eq!(out, [RED, BLUE]);

        processor.set_mapping_type(MappingType::UnicolorMean);
        processor.process(&image, &mut out).unwrap();
        assert_eq!(out[0], out[1]);
        assert_eq!(out[0], Rgb::new(127, 0, 127));
    }

    #[test]
    fn test_hard_mapping_overrides_user_choice() {
        let pixels = [RED, BLUE, RED, BLUE];
        let image = ImageView::new(2, 2, &pixels).unwrap();
        let mut processor = ImageProcessor::<4>::new(&[led(0.0, 0.5), led(0.5, 1.0)]);
        processor.set_mapping_type(MappingType::UnicolorMean);
        processor.set_hard_mapping_type(Some(MappingType::MulticolorMean));
        assert_eq!(processor.mapping_type(), MappingType::MulticolorMean);
        assert_eq!(processor.user_mapping_type(), MappingType::UnicolorMean);

        let mut out = [BLACK; 2];
        processor.process(&image, &mut out).unwrap();
        assert_eq!(out, [RED, BLUE]);

        // Lifting the override restores the user setting.
        processor.set_hard_mapping_type(None);
        assert_eq!(processor.mapping_type(), MappingType::UnicolorMean);
    }

    #[test]
    fn test_blackborder_crop() {
        // 4x4 frame, one-pixel black border around a white center.
        let mut pixels = [BLACK; 16];
        for y in 1..3 {
            for x in 1..3 {
                pixels[y * 4 + x] = WHITE;
            }
        }
        let image = ImageView::new(4, 4, &pixels).unwrap();
        let mut processor = ImageProcessor::<4>::new(&[led(0.0, 1.0)]);

        let mut out = [BLACK; 1];
        processor.process(&image, &mut out).unwrap();
        assert_eq!(out[0], WHITE);

        // With detection disabled the border dims the average.
        processor.set_blackborder_detect_disabled(true);
        processor.process(&image, &mut out).unwrap();
        assert_eq!(out[0], Rgb::new(63, 63, 63));
    }

    #[test]
    fn test_all_black_frame_keeps_full_mapping() {
        let pixels = [BLACK; 16];
        let image = ImageView::new(4, 4, &pixels).unwrap();
        let mut processor = ImageProcessor::<4>::new(&[led(0.0, 1.0)]);

        let mut out = [WHITE; 1];
        processor.process(&image, &mut out).unwrap();
        assert_eq!(out[0], BLACK);
    }

    #[test]
    fn test_output_length_mismatch() {
        let pixels = [BLUE; 4];
        let image = ImageView::new(2, 2, &pixels).unwrap();
        let mut processor = ImageProcessor::<4>::new(&[led(0.0, 1.0)]);

        let mut out = [BLACK; 2];
        assert_eq!(
            processor.process(&image, &mut out),
            Err(ProcessError::GeometryMismatch)
        );
    }

    #[test]
    fn test_layout_change_rebuilds_regions() {
        let pixels = [RED, BLUE, RED, BLUE];
        let image = ImageView::new(2, 2, &pixels).unwrap();
        let mut processor = ImageProcessor::<4>::new(&[led(0.0, 1.0)]);

        let mut out = [BLACK; 1];
        processor.process(&image, &mut out).unwrap();

        processor.set_led_string(&[led(0.0, 0.5), led(0.5, 1.0)]);
        let mut out = [BLACK; 2];
        processor.process(&image, &mut out).unwrap();
        assert_eq!(out, [RED, BLUE]);
    }

    #[test]
    fn test_empty_image_is_rejected() {
        assert!(ImageView::new(0, 0, &[]).is_none());
        assert!(ImageView::new(2, 2, &[BLACK; 3]).is_none());
    }
}
