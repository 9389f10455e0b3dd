//! Applies a paging method to the container/content pair and measures it

use super::geometry::{ContainerGeometry, Frame};
use crate::config::{BookConfig, PagingMethod};
use crate::error::PagerError;
use crate::host::{px, LayoutHost, Position};
use crate::undo::StyleLog;
use log::debug;

/// Drives host layout into pages
#[derive(Debug, Default)]
pub struct LayoutDriver {
    last: Option<ContainerGeometry>,
}

impl LayoutDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Geometry from the last successful layout
    pub fn geometry(&self) -> Option<ContainerGeometry> {
        self.last
    }

    pub fn forget(&mut self) {
        self.last = None;
    }

    /// Style the container and content for `config.paging_method` and measure the result
    ///
    /// Every style write goes through `styles`, so leaving paginated mode is a
    /// replay of the log.
    pub fn apply_layout<H: LayoutHost + ?Sized>(
        &mut self,
        host: &mut H,
        frame: Frame,
        config: &BookConfig,
        styles: &mut StyleLog,
    ) -> Result<ContainerGeometry, PagerError> {
        if !host.is_visible(frame.container) {
            return Err(PagerError::NotVisible);
        }
        let m = config.effective_margins();
        let container = frame.container;
        let content = frame.content;

        styles.begin("layout");
        let (upper, lower, left, right) = (px(m.upper), px(m.lower), px(m.left), px(m.right));
        let z_index = config.z_index.to_string();
        styles.change_style(
            host,
            container,
            &[
                ("padding-top", upper.as_str()),
                ("padding-bottom", lower.as_str()),
                ("padding-left", left.as_str()),
                ("padding-right", right.as_str()),
                ("overflow", "hidden"),
                ("box-sizing", "border-box"),
                ("z-index", z_index.as_str()),
            ],
        );
        if host.position(container) == Position::Static {
            styles.set_style(host, container, "position", Some("relative"));
        }

        match config.paging_method {
            PagingMethod::Column => {
                let width = host.client_width(container) - m.left - m.right;
                let height = host.client_height(container) - m.upper - m.lower;
                let (width, height, gap) = (px(width), px(height), px(config.column_gap()));
                styles.change_style(
                    host,
                    content,
                    &[
                        ("display", "block"),
                        ("margin-top", "0px"),
                        ("margin-bottom", "0px"),
                        ("width", width.as_str()),
                        ("height", height.as_str()),
                        ("column-width", width.as_str()),
                        ("column-gap", gap.as_str()),
                        ("column-fill", "auto"),
                    ],
                );
            }
            PagingMethod::Vertical => {
                styles.change_style(
                    host,
                    content,
                    &[
                        ("display", "block"),
                        ("margin-top", "0px"),
                        ("margin-bottom", "0px"),
                    ],
                );
                for property in ["column-width", "column-gap", "height"] {
                    if host.inline_style(content, property).is_some() {
                        styles.set_style(host, content, property, None);
                    }
                }
            }
        }

        // A leading margin would open a gap above the first page
        let mut first = host.first_element_child(content);
        while let Some(node) = first {
            styles.set_style(host, node, "margin-top", Some("0px"));
            first = host.first_element_child(node);
        }
        styles.commit();

        let geometry = self.measure(host, frame, config);
        debug!(
            "layout applied: {:?} width={} height={} page_length={}",
            config.paging_method, geometry.width, geometry.height, geometry.page_length
        );
        if !geometry.is_valid() {
            return Err(PagerError::InvalidGeometry {
                width: geometry.width,
                height: geometry.height,
                page_length: geometry.page_length,
            });
        }
        self.last = Some(geometry);
        Ok(geometry)
    }

    /// Read the current geometry without restyling anything
    pub fn measure<H: LayoutHost + ?Sized>(
        &self,
        host: &H,
        frame: Frame,
        config: &BookConfig,
    ) -> ContainerGeometry {
        if !host.is_visible(frame.container) {
            return ContainerGeometry::invalid();
        }
        let margins = config.effective_margins();
        let width = host.client_width(frame.content);
        match config.paging_method {
            PagingMethod::Column => {
                let gap = config.column_gap();
                ContainerGeometry {
                    width,
                    height: host.client_height(frame.content),
                    page_length: width + gap,
                    column_gap: gap,
                    margins,
                }
            }
            PagingMethod::Vertical => {
                let page_length = host.client_height(frame.container);
                ContainerGeometry {
                    width,
                    height: page_length - margins.vertical_sum(),
                    page_length,
                    column_gap: 0.0,
                    margins,
                }
            }
        }
    }

    /// Geometry a fresh layout would produce, read from the container size
    ///
    /// Unlike [`LayoutDriver::measure`] this ignores the column width pinned
    /// on the content by the last layout.
    pub fn project<H: LayoutHost + ?Sized>(
        &self,
        host: &H,
        frame: Frame,
        config: &BookConfig,
    ) -> ContainerGeometry {
        if !host.is_visible(frame.container) {
            return ContainerGeometry::invalid();
        }
        let margins = config.effective_margins();
        match config.paging_method {
            PagingMethod::Column => {
                let width = host.client_width(frame.container) - margins.left - margins.right;
                let gap = config.column_gap();
                ContainerGeometry {
                    width,
                    height: host.client_height(frame.container) - margins.vertical_sum(),
                    page_length: width + gap,
                    column_gap: gap,
                    margins,
                }
            }
            PagingMethod::Vertical => self.measure(host, frame, config),
        }
    }

    /// The container no longer matches the last layout
    pub fn has_changed<H: LayoutHost + ?Sized>(
        &self,
        host: &H,
        frame: Frame,
        config: &BookConfig,
    ) -> bool {
        let current = self.project(host, frame, config);
        match self.last {
            Some(last) => !last.approx_eq(&current),
            None => current.is_valid(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{NodeId, SimHost};
    use crate::layout::Margins;

    fn fixture() -> (SimHost, Frame) {
        let mut host = SimHost::new(660.0, 800.0);
        let doc = host.document();
        let container = host.append_element(doc, "div");
        let content = host.append_element(container, "article");
        let p = host.append_element(content, "p");
        host.set_style(p, "margin-top", "16px");
        host.append_text(p, &"abcd ".repeat(600));
        (host, Frame::new(container, content))
    }

    fn config(method: PagingMethod) -> BookConfig {
        BookConfig {
            paging_method: method,
            margins: Margins::new(20.0, 20.0, 30.0, 30.0),
            ..BookConfig::default()
        }
    }

    #[test]
    fn test_column_layout_geometry() {
        let (mut host, frame) = fixture();
        let mut driver = LayoutDriver::new();
        let mut styles = StyleLog::new();
        let g = driver
            .apply_layout(&mut host, frame, &config(PagingMethod::Column), &mut styles)
            .unwrap();
        assert_eq!(g.width, 600.0);
        assert_eq!(g.height, 760.0);
        assert_eq!(g.column_gap, 60.0);
        assert_eq!(g.page_length, 660.0);
        assert_eq!(host.scroll_width(frame.container), 1320.0);
        let p: NodeId = host.children(frame.content)[0];
        assert_eq!(host.inline_style(p, "margin-top").as_deref(), Some("0px"));
    }

    #[test]
    fn test_vertical_layout_geometry() {
        let (mut host, frame) = fixture();
        let mut driver = LayoutDriver::new();
        let mut styles = StyleLog::new();
        let g = driver
            .apply_layout(&mut host, frame, &config(PagingMethod::Vertical), &mut styles)
            .unwrap();
        assert_eq!(g.page_length, 800.0);
        assert_eq!(g.height, 760.0);
        assert_eq!(g.width, 600.0);
    }

    #[test]
    fn test_layout_is_reversible() {
        let (mut host, frame) = fixture();
        let before = host.serialize(host.document());
        let mut driver = LayoutDriver::new();
        let mut styles = StyleLog::new();
        driver
            .apply_layout(&mut host, frame, &config(PagingMethod::Column), &mut styles)
            .unwrap();
        styles.recover_all(&mut host);
        assert_eq!(host.serialize(host.document()), before);
    }

    #[test]
    fn test_hidden_container_rejected_and_change_detection() {
        let (mut host, frame) = fixture();
        let mut driver = LayoutDriver::new();
        let mut styles = StyleLog::new();
        let config = config(PagingMethod::Column);
        driver
            .apply_layout(&mut host, frame, &config, &mut styles)
            .unwrap();
        assert!(!driver.has_changed(&host, frame, &config));

        host.resize(661.0, 800.0);
        assert!(!driver.has_changed(&host, frame, &config));
        host.resize(700.0, 800.0);
        assert!(driver.has_changed(&host, frame, &config));
        assert_eq!(driver.project(&host, frame, &config).width, 640.0);

        host.set_style(frame.container, "display", "none");
        assert_eq!(
            driver.apply_layout(&mut host, frame, &config, &mut styles),
            Err(PagerError::NotVisible)
        );
    }
}
