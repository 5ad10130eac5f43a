use quadreel::{
    PixelBuffer, QuadNode, RenderMode, ResizeCache, Resolution, Rgba8, Stamp, is_near_white,
    render_node,
};

fn res(h: u32, w: u32) -> Resolution {
    Resolution::new(h, w).unwrap()
}

fn gradient_buffer(h: u32, w: u32) -> PixelBuffer {
    let bytes: Vec<u8> = (0..h)
        .flat_map(|r| {
            (0..w).flat_map(move |c| [(r * 17 % 90) as u8, (c * 29 % 90) as u8, 0, 255])
        })
        .collect();
    PixelBuffer::from_rgba(res(h, w), bytes).unwrap()
}

fn assert_depth_bound(node: &QuadNode, limit: u32) {
    assert!(node.level() <= limit, "node at level {} > {limit}", node.level());
    if let Some(kids) = node.children() {
        for kid in kids {
            assert_depth_bound(kid, limit);
        }
    }
}

#[test]
fn uniform_buffer_terminates_at_the_root() {
    for limit in [1, 3, 8] {
        let buf = PixelBuffer::solid(res(16, 16), Rgba8::opaque(42, 42, 42));
        let tree = QuadNode::build(&buf, limit).unwrap();
        assert!(tree.is_leaf());
        assert_eq!(tree.level(), 0);
    }
}

#[test]
fn no_node_exceeds_the_build_limit() {
    let buf = gradient_buffer(37, 23);
    for limit in [0, 1, 2, 4] {
        let tree = QuadNode::build(&buf, limit).unwrap();
        assert_depth_bound(&tree, limit);
    }
}

#[test]
fn render_at_build_depth_recomposes_to_input_shape() {
    // Odd dimensions exercise the unequal cross-split; the recomposed
    // buffer must land back on exactly (H, W) with no gap or overlap.
    let buf = gradient_buffer(37, 23);
    let tree = QuadNode::build(&buf, 4).unwrap();
    let cache = ResizeCache::new();

    let out = render_node(&tree, 4, None, RenderMode::Plain, &cache).unwrap();
    assert_eq!(out.resolution(), buf.resolution());
}

#[test]
fn near_white_threshold_boundary() {
    assert!(is_near_white(Rgba8 {
        r: 100,
        g: 100,
        b: 100,
        a: 255
    }));
    assert!(!is_near_white(Rgba8 {
        r: 99,
        g: 100,
        b: 100,
        a: 255
    }));
}

#[test]
fn all_white_4x4_renders_to_pure_white() {
    let buf = PixelBuffer::solid(res(4, 4), Rgba8::WHITE);
    let tree = QuadNode::build(&buf, 2).unwrap();
    let cache = ResizeCache::new();

    let out = render_node(&tree, 2, None, RenderMode::Plain, &cache).unwrap();
    assert_eq!(out, PixelBuffer::solid(res(4, 4), Rgba8::WHITE));
}

#[test]
fn diagonal_quadrants_reassemble_in_nw_ne_sw_se_order() {
    let red = Rgba8::opaque(180, 0, 0);
    let blue = Rgba8::opaque(0, 0, 180);
    let bytes: Vec<u8> = (0..4u32)
        .flat_map(|r| {
            (0..4u32).flat_map(move |c| {
                let color = if (r < 2) == (c < 2) { red } else { blue };
                color.channels()
            })
        })
        .collect();
    let buf = PixelBuffer::from_rgba(res(4, 4), bytes).unwrap();
    let tree = QuadNode::build(&buf, 1).unwrap();
    let cache = ResizeCache::new();

    let out = render_node(&tree, 1, None, RenderMode::Plain, &cache).unwrap();
    assert_eq!(out, buf);
}

#[test]
fn outline_mode_leaves_2x2_regions_untouched() {
    let bytes = vec![
        10, 0, 0, 255, 0, 20, 0, 255, //
        0, 0, 30, 255, 40, 40, 40, 255,
    ];
    let buf = PixelBuffer::from_rgba(res(2, 2), bytes).unwrap();
    let tree = QuadNode::build(&buf, 0).unwrap();
    let cache = ResizeCache::new();

    let outlined = render_node(
        &tree,
        0,
        None,
        RenderMode::Outlined(Rgba8::WHITE),
        &cache,
    )
    .unwrap();
    assert_eq!(
        outlined,
        PixelBuffer::solid(res(2, 2), buf.mean_color())
    );
}

#[test]
fn resize_cache_is_idempotent_across_renders() {
    // Top half white (stamp territory), bottom half dark: rendering the
    // same tree twice must not resize the stamp a second time.
    let bytes: Vec<u8> = (0..4u32)
        .flat_map(|r| {
            (0..4u32).flat_map(move |_| {
                if r < 2 {
                    [255, 255, 255, 255]
                } else {
                    [10, 10, 10, 255]
                }
            })
        })
        .collect();
    let buf = PixelBuffer::from_rgba(res(4, 4), bytes).unwrap();
    let tree = QuadNode::build(&buf, 1).unwrap();
    let stamp = Stamp {
        id: 0,
        image: PixelBuffer::solid(res(6, 6), Rgba8::opaque(1, 2, 3)),
    };
    let cache = ResizeCache::new();

    let a = render_node(&tree, 1, Some(&stamp), RenderMode::Plain, &cache).unwrap();
    let b = render_node(&tree, 1, Some(&stamp), RenderMode::Plain, &cache).unwrap();

    assert_eq!(a, b);
    // Both white quadrants share one 2x2 resolution, so one entry.
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.resize_count(), 1);
    // The substituted quadrant carries stamp pixels, the dark ones do not.
    assert_eq!(a.pixel(0, 0), Rgba8::opaque(1, 2, 3));
    assert_eq!(a.pixel(3, 3), Rgba8::opaque(10, 10, 10));
}
