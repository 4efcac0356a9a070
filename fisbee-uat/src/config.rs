/// What to do with an information frame that fails to decode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MalformedFramePolicy {
    /// Log and drop the frame, then continue with the rest of the payload.
    ///
    /// Frames decoded before and after the malformed one are kept. A frame
    /// whose length runs past the end of the payload ends segmentation.
    #[default]
    Skip,

    /// Fail the whole message with the frame's error. No frames are kept.
    Abort,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecoderConfig {
    pub malformed_frames: MalformedFramePolicy,

    /// Expand DLAC tabulations into spaces in product text.
    pub expand_tabs: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            malformed_frames: MalformedFramePolicy::Skip,
            expand_tabs: true,
        }
    }
}

impl DecoderConfig {
    /// Configuration that aborts on the first malformed frame.
    pub fn strict() -> Self {
        Self {
            malformed_frames: MalformedFramePolicy::Abort,
            ..Default::default()
        }
    }

    /// Decodes DLAC text according to this configuration.
    pub(crate) fn decode_text(&self, bytes: &[u8], bit_length: usize) -> String {
        let text = crate::dlac::decode(bytes, bit_length);
        if self.expand_tabs {
            crate::dlac::expand_tabs(&text)
        }
        else {
            text
        }
    }
}
