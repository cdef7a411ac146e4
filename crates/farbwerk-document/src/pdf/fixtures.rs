// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory PDF fixtures for unit tests.

use lopdf::{Dictionary, Document, Object, Stream, dictionary};

/// One page of a fixture document.
pub(crate) struct FixturePage {
    pub width: f32,
    pub height: f32,
    pub content: Vec<u8>,
    /// /Rotate on the page dictionary, when set.
    pub rotate: Option<i64>,
}

impl FixturePage {
    pub fn blank(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            content: Vec::new(),
            rotate: None,
        }
    }

    pub fn with_content(width: f32, height: f32, content: &str) -> Self {
        Self {
            width,
            height,
            content: content.as_bytes().to_vec(),
            rotate: None,
        }
    }

    pub fn rotated(mut self, degrees: i64) -> Self {
        self.rotate = Some(degrees);
        self
    }

    /// A page whose only content is a 1x1 RGB image scaled to 100x100.
    pub fn image_only(width: f32, height: f32) -> Self {
        Self::with_content(width, height, "q 100 0 0 100 50 50 cm /Im1 Do Q")
    }
}

/// Build a PDF where every page shares Helvetica (WinAnsi) as /F1, Courier
/// as /F2, and a one-pixel red image as /Im1.
pub(crate) fn build_pdf(pages: &[FixturePage]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let helvetica_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let courier_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
        "FirstChar" => 32,
        "LastChar" => 126,
        "Widths" => vec![Object::Integer(600); 95],
    });
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 1,
            "Height" => 1,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        vec![255, 0, 0],
    ));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => helvetica_id,
            "F2" => courier_id,
        },
        "XObject" => dictionary! {
            "Im1" => image_id,
        },
    });

    let mut kids = Vec::with_capacity(pages.len());
    for page in pages {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), page.content.clone()));
        let mut page_dict = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), page.width.into(), page.height.into()],
            "Contents" => content_id,
            "Resources" => resources_id,
        };
        if let Some(rotate) = page.rotate {
            page_dict.set("Rotate", rotate);
        }
        let page_id = doc.add_object(page_dict);
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut output = Vec::new();
    doc.save_to(&mut output).expect("serialise fixture PDF");
    output
}
