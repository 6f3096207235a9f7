mod tests {
    use lightmux::color::{ColorOrder, Rgb, blend_colors};

    const SAMPLE: Rgb = Rgb::new(10, 20, 30);

    fn ordered(order: ColorOrder) -> Rgb {
        let mut color = SAMPLE;
        order.apply(&mut color);
        color
    }

    #[test]
    fn test_order_permutations() {
        assert_eq!(ordered(ColorOrder::Rgb), Rgb::new(10, 20, 30));
        assert_eq!(ordered(ColorOrder::Bgr), Rgb::new(30, 20, 10));
        assert_eq!(ordered(ColorOrder::Rbg), Rgb::new(10, 30, 20));
        assert_eq!(ordered(ColorOrder::Grb), Rgb::new(20, 10, 30));
        assert_eq!(ordered(ColorOrder::Gbr), Rgb::new(20, 30, 10));
        assert_eq!(ordered(ColorOrder::Brg), Rgb::new(30, 10, 20));
    }

    #[test]
    fn test_order_parse_roundtrip() {
        for order in [
            ColorOrder::Rgb,
            ColorOrder::Bgr,
            ColorOrder::Rbg,
            ColorOrder::Grb,
            ColorOrder::Gbr,
            ColorOrder::Brg,
        ] {
            assert_eq!(ColorOrder::parse_from_str(order.as_str()), Some(order));
        }
        assert_eq!(ColorOrder::parse_from_str("bogus"), None);
    }

    #[test]
    fn test_blend_colors() {
        let red = Rgb::new(255, 0, 0);
        let blue = Rgb::new(0, 0, 255);
        assert_eq!(blend_colors(red, blue, 0), red);
        assert_eq!(blend_colors(red, blue, 255), blue);
        assert_eq!(blend_colors(red, blue, 128), Rgb::new(127, 0, 128));
    }
}
