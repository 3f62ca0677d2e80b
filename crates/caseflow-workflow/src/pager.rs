//! 分页
//!
//! 页码从 1 开始，越界页返回空切片

/// 页码按钮窗口的默认宽度
pub const DEFAULT_PAGE_WINDOW: usize = 5;

/// 总页数，空集或页大小为 0 时为 0
pub fn total_pages(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

/// 取第 `page_number` 页
pub fn page<T: Clone>(records: &[T], page_size: usize, page_number: usize) -> Vec<T> {
    let pages = total_pages(records.len(), page_size);
    if page_number == 0 || page_number > pages {
        return Vec::new();
    }

    let start = (page_number - 1) * page_size;
    let end = (start + page_size).min(records.len());
    records[start..end].to_vec()
}

/// 计算要显示的页码窗口
pub fn page_window(total_pages: usize, current_page: usize, window: usize) -> Vec<usize> {
    if window == 0 {
        return Vec::new();
    }
    if total_pages <= window {
        return (1..=total_pages).collect();
    }

    let half = window / 2;
    if current_page <= half + 1 {
        (1..=window).collect()
    } else if current_page > total_pages.saturating_sub(half + 1) {
        (total_pages - window + 1..=total_pages).collect()
    } else {
        let start = current_page - half;
        (start..start + window).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(5, 0), 0);
    }

    #[test]
    fn test_out_of_range_pages_are_empty() {
        let items: Vec<u32> = (1..=25).collect();
        assert!(page(&items, 10, 0).is_empty());
        assert!(page(&items, 10, 4).is_empty());
        assert!(page(&Vec::<u32>::new(), 10, 1).is_empty());
        assert_eq!(page(&items, 10, 3), vec![21, 22, 23, 24, 25]);
    }

    #[test]
    fn test_pages_reconstruct_full_set() {
        let items: Vec<u32> = (1..=37).collect();
        let rebuilt: Vec<u32> = (1..=total_pages(items.len(), 10))
            .flat_map(|p| page(&items, 10, p))
            .collect();
        assert_eq!(rebuilt, items);
    }

    #[test]
    fn test_page_window() {
        assert_eq!(page_window(0, 1, 5), Vec::<usize>::new());
        assert_eq!(page_window(3, 2, 5), vec![1, 2, 3]);
        assert_eq!(page_window(12, 2, 5), vec![1, 2, 3, 4, 5]);
        assert_eq!(page_window(12, 3, 5), vec![1, 2, 3, 4, 5]);
        assert_eq!(page_window(12, 7, 5), vec![5, 6, 7, 8, 9]);
        assert_eq!(page_window(12, 10, 5), vec![8, 9, 10, 11, 12]);
        assert_eq!(page_window(12, 9, 5), vec![7, 8, 9, 10, 11]);
    }

    #[test]
    fn test_page_window_for_page_past_the_end() {
        assert_eq!(page_window(12, 13, 5), vec![8, 9, 10, 11, 12]);
        assert_eq!(page_window(12, usize::MAX, 5), vec![8, 9, 10, 11, 12]);
        assert!(page(&(1..=120).collect::<Vec<u32>>(), 10, usize::MAX).is_empty());
    }
}
